//! Per-attribute index for mutable containers

use std::collections::HashSet;
use std::ops::Bound;

use crate::config::IndexConfig;
use crate::observability::Logger;
use crate::value::{Attribute, Record, Value};

use super::container::{Removal, ValueContainer};
use super::errors::{IndexError, IndexResult};
use super::ids::{IdSet, ObjectId};
use super::value_map::{MapOrder, ValueMap};
use super::AttributeLookup;

/// How an identity left the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Found under the object's current value
    Direct,
    /// Found only by scanning; the object changed without `update`
    Stale,
    /// Not indexed under this attribute
    Absent,
}

/// Value → identities for one attribute, plus a bucket for `Null`.
///
/// Identities whose attribute is missing are not tracked at all.
pub struct MutableAttributeIndex<T> {
    attribute: Attribute<T>,
    config: IndexConfig,
    none_ids: Option<ValueContainer>,
    values: ValueMap,
    n_ids: usize,
}

impl<T> MutableAttributeIndex<T> {
    /// Empty index for `attribute`
    pub fn new(attribute: Attribute<T>, config: IndexConfig) -> Self {
        Self {
            attribute,
            config,
            none_ids: None,
            values: ValueMap::new(),
            n_ids: 0,
        }
    }

    /// The accessor this index evaluates
    pub fn attribute(&self) -> &Attribute<T> {
        &self.attribute
    }
}

impl<T: Record> MutableAttributeIndex<T> {
    /// Index `obj` under `id`. The caller guarantees `id` is not yet indexed.
    ///
    /// Returns true if this add degraded the value map to unordered.
    pub fn add(&mut self, id: ObjectId, obj: &T) -> bool {
        let Some(value) = self.attribute.evaluate(obj) else {
            return false;
        };
        self.n_ids += 1;

        if value.is_null() {
            match &mut self.none_ids {
                Some(bucket) => bucket.add(id, &self.config),
                None => self.none_ids = Some(ValueContainer::new(id)),
            }
            return false;
        }

        let kind = value.kind();
        let degraded = self.values.insert(value, id, &self.config);
        if degraded {
            Logger::warn(
                "INDEX_ORDER_DEGRADED",
                &[
                    ("attribute", self.attribute.name()),
                    ("value_kind", kind),
                    ("distinct_values", &self.values.len().to_string()),
                ],
            );
        }
        degraded
    }

    /// Remove `id`, re-reading the attribute from `obj`.
    ///
    /// Falls back to a scan over every value when the object's current value
    /// no longer matches what was indexed.
    pub fn remove(&mut self, id: ObjectId, obj: &T) -> RemoveOutcome {
        if let Some(value) = self.attribute.evaluate(obj) {
            if self.remove_under(&value, id) {
                self.n_ids -= 1;
                return RemoveOutcome::Direct;
            }
        }

        if self.n_ids == 0 {
            return RemoveOutcome::Absent;
        }
        let found = if self.remove_from_none(id) {
            Some(Value::Null)
        } else {
            self.values.remove_anywhere(id, &self.config)
        };
        match found {
            Some(previous) => {
                self.n_ids -= 1;
                Logger::warn(
                    "STALE_VALUE_REMOVE",
                    &[
                        ("attribute", self.attribute.name()),
                        ("indexed_kind", previous.kind()),
                        ("object_id", &id.index().to_string()),
                    ],
                );
                RemoveOutcome::Stale
            }
            None => RemoveOutcome::Absent,
        }
    }

    fn remove_under(&mut self, value: &Value, id: ObjectId) -> bool {
        if value.is_null() {
            self.remove_from_none(id)
        } else {
            self.values.remove(value, id, &self.config)
        }
    }

    fn remove_from_none(&mut self, id: ObjectId) -> bool {
        let Some(bucket) = &mut self.none_ids else {
            return false;
        };
        match bucket.remove(id, &self.config) {
            Removal::NotFound => false,
            Removal::Removed => true,
            Removal::Emptied => {
                self.none_ids = None;
                true
            }
        }
    }
}

impl<T> MutableAttributeIndex<T> {
    /// Identities holding exactly `value`. `Null` reads the None bucket.
    pub fn point_lookup(&self, value: &Value) -> IdSet {
        let container = if value.is_null() {
            self.none_ids.as_ref()
        } else {
            self.values.get(value)
        };
        container.map(ValueContainer::to_id_set).unwrap_or_default()
    }

    /// Every identity that has this attribute, including `Null` holders
    pub fn all_ids(&self) -> IdSet {
        let mut out = IdSet::with_capacity(self.n_ids);
        if let Some(bucket) = &self.none_ids {
            bucket.extend_into(&mut out);
        }
        for container in self.values.containers() {
            container.extend_into(&mut out);
        }
        out
    }

    /// Identities whose value lies within the bounds
    pub fn range_lookup(&self, lo: Bound<&Value>, hi: Bound<&Value>) -> IndexResult<IdSet> {
        let containers = self
            .values
            .range(lo, hi)
            .map_err(|e| IndexError::incomparable(self.attribute.name(), e.to_string()))?;
        let mut out = IdSet::new();
        for container in containers {
            container.extend_into(&mut out);
        }
        Ok(out)
    }

    /// Distinct values, including `Null` when any object holds it
    pub fn all_values(&self) -> HashSet<Value> {
        let mut values = self.values.values();
        if self.none_ids.is_some() {
            values.insert(Value::Null);
        }
        values
    }

    /// Number of identities tracked
    pub fn len(&self) -> usize {
        self.n_ids
    }

    /// Returns true if no identity is tracked
    pub fn is_empty(&self) -> bool {
        self.n_ids == 0
    }

    /// Whether range lookups are available
    pub fn order(&self) -> MapOrder {
        self.values.order()
    }
}

impl<T> AttributeLookup for MutableAttributeIndex<T> {
    type Hits = IdSet;

    fn name(&self) -> &str {
        self.attribute.name()
    }

    fn lookup_value(&self, value: &Value) -> IdSet {
        self.point_lookup(value)
    }

    fn lookup_any(&self) -> IdSet {
        self.all_ids()
    }

    fn lookup_range(&self, lo: Bound<&Value>, hi: Bound<&Value>) -> IndexResult<IdSet> {
        self.range_lookup(lo, hi)
    }
}
