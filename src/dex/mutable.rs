//! Mutable container

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::index::{
    IdSet, IndexError, IndexResult, MutableAttributeIndex, ObjectId, RemoveOutcome,
};
use crate::observability::DexMetrics;
use crate::query::{Filter, QueryEvaluator, QueryPlan};
use crate::value::{Attribute, Record, Value};

use super::arena::ObjectArena;
use super::collect_attributes;

/// Mutable multi-attribute index over shared objects.
///
/// ```ignore
/// use std::sync::Arc;
/// use attrdex::{Dex, Filter};
/// use serde_json::json;
///
/// let mut dex = Dex::new(Vec::new(), ["name", "level"])?;
/// let pika = Arc::new(json!({"name": "Pikachu", "level": 12}));
/// dex.add(Arc::clone(&pika));
/// let hits = dex.find(&Filter::new().with("name", "Pikachu"), &Filter::new())?;
/// ```
pub struct Dex<T> {
    objects: ObjectArena<T>,
    indexes: Vec<MutableAttributeIndex<T>>,
    config: IndexConfig,
    metrics: DexMetrics,
}

impl<T: Record> Dex<T> {
    /// Create a container holding `objects`, indexed on `on`.
    ///
    /// Objects may lack any of the attributes. Fails if `on` is empty or
    /// names an attribute twice.
    pub fn new<I, A, O>(objects: I, on: O) -> IndexResult<Self>
    where
        I: IntoIterator<Item = Arc<T>>,
        O: IntoIterator<Item = A>,
        A: Into<Attribute<T>>,
    {
        Self::with_config(objects, on, IndexConfig::default())
    }

    /// Create with explicit thresholds
    pub fn with_config<I, A, O>(objects: I, on: O, config: IndexConfig) -> IndexResult<Self>
    where
        I: IntoIterator<Item = Arc<T>>,
        O: IntoIterator<Item = A>,
        A: Into<Attribute<T>>,
    {
        config.validate()?;
        let indexes = collect_attributes(on)?
            .into_iter()
            .map(|attribute| MutableAttributeIndex::new(attribute, config))
            .collect();
        let mut dex = Dex {
            objects: ObjectArena::new(),
            indexes,
            config,
            metrics: DexMetrics::new(),
        };
        for obj in objects {
            dex.add(obj);
        }
        Ok(dex)
    }

    /// Add an object, indexing every attribute.
    ///
    /// Adding an object that is already present does nothing; use
    /// [`Dex::update`] to re-read its attributes. Returns true if added.
    pub fn add(&mut self, obj: Arc<T>) -> bool {
        let (id, inserted) = self.objects.insert(Arc::clone(&obj));
        if !inserted {
            return false;
        }
        for index in &mut self.indexes {
            if index.add(id, &obj) {
                self.metrics.increment_order_degradations();
            }
        }
        self.metrics.increment_added();
        true
    }

    /// Remove an object. Fails with `ObjectNotPresent` if it is not stored.
    pub fn remove(&mut self, obj: &Arc<T>) -> IndexResult<()> {
        let id = self.objects.id_of(obj).ok_or_else(IndexError::object_not_present)?;
        for index in &mut self.indexes {
            if index.remove(id, obj) == RemoveOutcome::Stale {
                self.metrics.increment_stale_removes();
            }
        }
        self.objects.remove(id);
        self.metrics.increment_removed();
        Ok(())
    }

    /// Re-index an object after it changed. Fails if it is not stored.
    pub fn update(&mut self, obj: &Arc<T>) -> IndexResult<()> {
        self.remove(obj)?;
        self.add(Arc::clone(obj));
        Ok(())
    }

    /// Objects satisfying every `matching` term and no `excluding` term,
    /// in ascending identity order.
    pub fn find(&self, matching: &Filter, excluding: &Filter) -> IndexResult<Vec<Arc<T>>> {
        let result = self.find_ids(matching, excluding, QueryPlan::from_find(matching, excluding));
        self.resolve(result)
    }

    /// Objects satisfying `filter`; `!=` and `not in` terms exclude.
    pub fn query(&self, filter: &Filter) -> IndexResult<Vec<Arc<T>>> {
        let result = self.find_ids(filter, &Filter::new(), QueryPlan::from_query(filter));
        self.resolve(result)
    }

    fn find_ids(
        &self,
        matching: &Filter,
        excluding: &Filter,
        plan: IndexResult<QueryPlan>,
    ) -> IndexResult<IdSet> {
        let evaluator = QueryEvaluator::new(&self.indexes);
        evaluator.check_indexed(matching.attributes().chain(excluding.attributes()))?;
        evaluator.find_ids(&plan?, || self.objects.ids())
    }

    fn resolve(&self, result: IndexResult<IdSet>) -> IndexResult<Vec<Arc<T>>> {
        self.metrics.record_find(result.is_ok());
        let mut ids: Vec<ObjectId> = result?.into_iter().collect();
        ids.sort_unstable();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.objects.get(id).cloned())
            .collect())
    }

    /// Distinct values of an attribute, `Null` included if present
    pub fn get_values(&self, attribute: &str) -> IndexResult<HashSet<Value>> {
        self.index(attribute)
            .map(MutableAttributeIndex::all_values)
            .ok_or_else(|| IndexError::attribute_not_indexed(&[attribute]))
    }

    fn index(&self, name: &str) -> Option<&MutableAttributeIndex<T>> {
        self.indexes.iter().find(|idx| idx.attribute().name() == name)
    }
}

impl<T> Dex<T> {
    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns true if this exact object (by identity) is stored
    pub fn contains(&self, obj: &Arc<T>) -> bool {
        self.objects.id_of(obj).is_some()
    }

    /// Borrow the stored objects
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> + '_ {
        self.objects.iter().map(|(_, obj)| obj)
    }

    /// Point-in-time copy of the stored objects
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.iter().cloned().collect()
    }

    /// Indexed attributes, in construction order
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute<T>> + '_ {
        self.indexes.iter().map(|idx| idx.attribute())
    }

    /// Number of objects tracked by one attribute's index
    pub fn index_len(&self, attribute: &str) -> Option<usize> {
        self.indexes
            .iter()
            .find(|idx| idx.attribute().name() == attribute)
            .map(|idx| idx.len())
    }

    /// Thresholds in use
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Operational counters
    pub fn metrics(&self) -> &DexMetrics {
        &self.metrics
    }
}

impl<T> fmt::Debug for Dex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.attributes().map(|a| a.name()).collect();
        f.debug_struct("Dex")
            .field("len", &self.len())
            .field("on", &names)
            .finish()
    }
}
