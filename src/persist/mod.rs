//! Save and load containers as JSON
//!
//! A saved container is a single document:
//!
//! ```json
//! {
//!   "objects": [ ... ],
//!   "on": [{"name": "level", "kind": "field"}, {"name": "odd", "kind": "derived"}],
//!   "config": {"array_max": 20, "set_min": 10, "frozen_extract_threshold": 100},
//!   "priority": "readers"
//! }
//! ```
//!
//! Loading rebuilds the container from scratch; no index state is stored.
//! Derived attributes are functions and cannot be written out, so the
//! caller passes them again at load, matched by name. `priority` is only
//! present for [`ConcurrentDex`].

mod errors;

pub use errors::{PersistError, PersistResult};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::concurrent::{ConcurrentDex, LockPriority};
use crate::config::IndexConfig;
use crate::dex::{Dex, FrozenDex};
use crate::index::IndexResult;
use crate::observability::Logger;
use crate::value::{Attribute, Record};

/// How an attribute is read, as recorded in a saved document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Field lookup by name
    Field,
    /// Caller-supplied function
    Derived,
}

/// One entry of a saved `on` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAttribute {
    /// Query name
    pub name: String,
    /// Accessor kind
    pub kind: AttributeKind,
}

impl<T> From<&Attribute<T>> for SavedAttribute {
    fn from(attribute: &Attribute<T>) -> Self {
        let kind = if attribute.is_derived() {
            AttributeKind::Derived
        } else {
            AttributeKind::Field
        };
        SavedAttribute {
            name: attribute.name().to_string(),
            kind,
        }
    }
}

#[derive(Serialize)]
struct SavedDoc<'a, T> {
    objects: Vec<&'a T>,
    on: Vec<SavedAttribute>,
    config: IndexConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<LockPriority>,
}

#[derive(Deserialize)]
struct LoadedDoc<T> {
    objects: Vec<T>,
    on: Vec<SavedAttribute>,
    #[serde(default)]
    config: IndexConfig,
    #[serde(default)]
    priority: Option<LockPriority>,
}

/// A container that can be written out and rebuilt
pub trait Persistable: Sized {
    /// Stored object type
    type Object;

    /// Objects to write, in the container's natural order
    fn saved_objects(&self) -> Vec<Arc<Self::Object>>;

    /// Indexed attributes, in construction order
    fn saved_attributes(&self) -> Vec<SavedAttribute>;

    /// Thresholds to restore
    fn saved_config(&self) -> IndexConfig;

    /// Lock policy to restore, if the container has one
    fn saved_priority(&self) -> Option<LockPriority> {
        None
    }

    /// Construct from loaded parts
    fn rebuild(
        objects: Vec<Arc<Self::Object>>,
        on: Vec<Attribute<Self::Object>>,
        config: IndexConfig,
        priority: Option<LockPriority>,
    ) -> IndexResult<Self>;
}

impl<T: Record> Persistable for Dex<T> {
    type Object = T;

    fn saved_objects(&self) -> Vec<Arc<T>> {
        self.snapshot()
    }

    fn saved_attributes(&self) -> Vec<SavedAttribute> {
        self.attributes().map(SavedAttribute::from).collect()
    }

    fn saved_config(&self) -> IndexConfig {
        *self.config()
    }

    fn rebuild(
        objects: Vec<Arc<T>>,
        on: Vec<Attribute<T>>,
        config: IndexConfig,
        _priority: Option<LockPriority>,
    ) -> IndexResult<Self> {
        Dex::with_config(objects, on, config)
    }
}

impl<T: Record> Persistable for FrozenDex<T> {
    type Object = T;

    fn saved_objects(&self) -> Vec<Arc<T>> {
        self.snapshot()
    }

    fn saved_attributes(&self) -> Vec<SavedAttribute> {
        self.attributes().map(SavedAttribute::from).collect()
    }

    fn saved_config(&self) -> IndexConfig {
        *self.config()
    }

    fn rebuild(
        objects: Vec<Arc<T>>,
        on: Vec<Attribute<T>>,
        config: IndexConfig,
        _priority: Option<LockPriority>,
    ) -> IndexResult<Self> {
        FrozenDex::with_config(objects, on, config)
    }
}

impl<T: Record> Persistable for ConcurrentDex<T> {
    type Object = T;

    fn saved_objects(&self) -> Vec<Arc<T>> {
        self.snapshot()
    }

    fn saved_attributes(&self) -> Vec<SavedAttribute> {
        self.read().attributes().map(SavedAttribute::from).collect()
    }

    fn saved_config(&self) -> IndexConfig {
        *self.read().config()
    }

    fn saved_priority(&self) -> Option<LockPriority> {
        Some(self.priority())
    }

    fn rebuild(
        objects: Vec<Arc<T>>,
        on: Vec<Attribute<T>>,
        config: IndexConfig,
        priority: Option<LockPriority>,
    ) -> IndexResult<Self> {
        ConcurrentDex::with_config(objects, on, config, priority.unwrap_or_default())
    }
}

/// Write `container` as JSON to `writer`
pub fn save<C, W>(container: &C, writer: W) -> PersistResult<()>
where
    C: Persistable,
    C::Object: Serialize,
    W: Write,
{
    let objects = container.saved_objects();
    let doc = SavedDoc {
        objects: objects.iter().map(Arc::as_ref).collect(),
        on: container.saved_attributes(),
        config: container.saved_config(),
        priority: container.saved_priority(),
    };
    serde_json::to_writer(writer, &doc)?;
    Logger::info(
        "DEX_SAVED",
        &[
            ("objects", &doc.objects.len().to_string()),
            ("attributes", &doc.on.len().to_string()),
        ],
    );
    Ok(())
}

/// Rebuild a container from JSON.
///
/// `derived` must hold every derived attribute the document lists. An entry
/// whose name matches a field attribute replaces it.
pub fn load<C, R>(reader: R, derived: Vec<Attribute<C::Object>>) -> PersistResult<C>
where
    C: Persistable,
    C::Object: DeserializeOwned,
    R: Read,
{
    let doc: LoadedDoc<C::Object> = serde_json::from_reader(reader)?;
    let n_objects = doc.objects.len();
    let n_attributes = doc.on.len();
    let container = rebuild_from_doc::<C>(doc, derived).map_err(|err| {
        let message = err.to_string();
        let fields = [("error", message.as_str())];
        // a mismatched attribute list is the caller's mistake
        if err.is_attribute_mismatch() {
            Logger::warn("DEX_LOAD_REJECTED", &fields);
        } else {
            Logger::error("DEX_LOAD_FAILED", &fields);
        }
        err
    })?;
    Logger::info(
        "DEX_LOADED",
        &[
            ("objects", &n_objects.to_string()),
            ("attributes", &n_attributes.to_string()),
        ],
    );
    Ok(container)
}

fn rebuild_from_doc<C: Persistable>(
    doc: LoadedDoc<C::Object>,
    derived: Vec<Attribute<C::Object>>,
) -> PersistResult<C> {
    let on = resolve_attributes(&doc.on, derived)?;
    let objects = doc.objects.into_iter().map(Arc::new).collect();
    Ok(C::rebuild(objects, on, doc.config, doc.priority)?)
}

/// Save to a file, creating or truncating it
pub fn save_to_path<C>(container: &C, path: impl AsRef<Path>) -> PersistResult<()>
where
    C: Persistable,
    C::Object: Serialize,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    save(container, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Load from a file written by [`save_to_path`]
pub fn load_from_path<C>(path: impl AsRef<Path>, derived: Vec<Attribute<C::Object>>) -> PersistResult<C>
where
    C: Persistable,
    C::Object: DeserializeOwned,
{
    let file = File::open(path)?;
    load(BufReader::new(file), derived)
}

fn resolve_attributes<T>(
    saved: &[SavedAttribute],
    supplied: Vec<Attribute<T>>,
) -> PersistResult<Vec<Attribute<T>>> {
    if let Some(extra) = supplied
        .iter()
        .find(|a| !saved.iter().any(|s| s.name == a.name()))
    {
        return Err(PersistError::UnknownAttribute(extra.name().to_string()));
    }

    let mut supplied: Vec<Option<Attribute<T>>> = supplied.into_iter().map(Some).collect();
    let mut on = Vec::with_capacity(saved.len());
    for entry in saved {
        let given = supplied
            .iter_mut()
            .find(|slot| slot.as_ref().map_or(false, |a| a.name() == entry.name))
            .and_then(Option::take);
        let attribute = match (given, entry.kind) {
            (Some(attribute), _) => attribute,
            (None, AttributeKind::Field) => Attribute::field(entry.name.as_str()),
            (None, AttributeKind::Derived) => {
                return Err(PersistError::MissingAttribute(entry.name.clone()))
            }
        };
        on.push(attribute);
    }
    Ok(on)
}
