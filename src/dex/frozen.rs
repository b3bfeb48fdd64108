//! Frozen container
//!
//! Built once from a fixed object list. Identities are positions in that
//! list, so ascending identities are insertion order and every lookup
//! combines sorted arrays by merging.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::index::{FrozenAttributeIndex, IndexError, IndexResult, ObjectId, SortedIds};
use crate::observability::{DexMetrics, ObservationScope};
use crate::query::{Filter, QueryEvaluator, QueryPlan};
use crate::value::{Attribute, Record, Value};

use super::arena::address;
use super::collect_attributes;

/// Immutable multi-attribute index over shared objects.
pub struct FrozenDex<T> {
    objects: Vec<Arc<T>>,
    /// Object addresses, ascending, for `contains`
    addresses: Vec<usize>,
    attributes: Vec<Attribute<T>>,
    indexes: Vec<FrozenAttributeIndex>,
    config: IndexConfig,
    metrics: DexMetrics,
}

impl<T: Record> FrozenDex<T> {
    /// Build over `objects`, indexed on `on`.
    ///
    /// Fails if `objects` or `on` is empty, or `on` repeats a name. An
    /// object listed twice (same `Arc`) is kept once, at its first position.
    pub fn new<I, A, O>(objects: I, on: O) -> IndexResult<Self>
    where
        I: IntoIterator<Item = Arc<T>>,
        O: IntoIterator<Item = A>,
        A: Into<Attribute<T>>,
    {
        Self::with_config(objects, on, IndexConfig::default())
    }

    /// Build with explicit thresholds
    pub fn with_config<I, A, O>(objects: I, on: O, config: IndexConfig) -> IndexResult<Self>
    where
        I: IntoIterator<Item = Arc<T>>,
        O: IntoIterator<Item = A>,
        A: Into<Attribute<T>>,
    {
        config.validate()?;
        let attributes = collect_attributes(on)?;

        let mut seen = HashSet::new();
        let objects: Vec<Arc<T>> = objects
            .into_iter()
            .filter(|obj| seen.insert(address(obj)))
            .collect();
        if objects.is_empty() {
            return Err(IndexError::invalid_construction(
                "Cannot build a frozen container with no objects",
            ));
        }

        let n_objects = objects.len().to_string();
        let n_attributes = attributes.len().to_string();
        let scope = ObservationScope::with_fields(
            "FROZEN_BUILD",
            &[("objects", &n_objects), ("attributes", &n_attributes)],
        );
        let indexes: Vec<FrozenAttributeIndex> = attributes
            .iter()
            .map(|attribute| FrozenAttributeIndex::build(attribute, &objects, &config))
            .collect();
        let mut addresses: Vec<usize> = seen.into_iter().collect();
        addresses.sort_unstable();
        let orderable = indexes.iter().filter(|idx| idx.is_orderable()).count();
        scope.complete_with_fields(&[("orderable_indexes", &orderable.to_string())]);

        Ok(FrozenDex {
            objects,
            addresses,
            attributes,
            indexes,
            config,
            metrics: DexMetrics::new(),
        })
    }
}

impl<T> FrozenDex<T> {
    /// Objects satisfying every `matching` term and no `excluding` term,
    /// in insertion order.
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
    ) -> IndexResult<SortedIds> {
        let evaluator = QueryEvaluator::new(&self.indexes);
        evaluator.check_indexed(matching.attributes().chain(excluding.attributes()))?;
        let universe = || SortedIds::from_sorted((0..self.objects.len()).map(ObjectId::new).collect());
        evaluator.find_ids(&plan?, universe)
    }

    fn resolve(&self, result: IndexResult<SortedIds>) -> IndexResult<Vec<Arc<T>>> {
        self.metrics.record_find(result.is_ok());
        Ok(result?
            .iter()
            .filter_map(|id| self.objects.get(id.index()).cloned())
            .collect())
    }

    /// Always fails: frozen containers cannot change
    pub fn add(&self, _obj: Arc<T>) -> IndexResult<()> {
        Err(IndexError::immutable("add"))
    }

    /// Always fails: frozen containers cannot change
    pub fn remove(&self, _obj: &Arc<T>) -> IndexResult<()> {
        Err(IndexError::immutable("remove"))
    }

    /// Always fails: frozen containers cannot change
    pub fn update(&self, _obj: &Arc<T>) -> IndexResult<()> {
        Err(IndexError::immutable("update"))
    }

    /// Distinct values of an attribute, `Null` included if present
    pub fn get_values(&self, attribute: &str) -> IndexResult<HashSet<Value>> {
        self.index(attribute)
            .map(FrozenAttributeIndex::all_values)
            .ok_or_else(|| IndexError::attribute_not_indexed(&[attribute]))
    }

    fn index(&self, name: &str) -> Option<&FrozenAttributeIndex> {
        self.attributes
            .iter()
            .position(|a| a.name() == name)
            .map(|i| &self.indexes[i])
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Never true: construction requires objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns true if this exact object (by identity) is stored
    pub fn contains(&self, obj: &Arc<T>) -> bool {
        self.addresses.binary_search(&address(obj)).is_ok()
    }

    /// Object at an insertion position
    pub fn get(&self, position: usize) -> Option<&Arc<T>> {
        self.objects.get(position)
    }

    /// Borrow the stored objects in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.objects.iter()
    }

    /// Copy of the stored objects in insertion order
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.objects.clone()
    }

    /// Indexed attributes, in construction order
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute<T>> + '_ {
        self.attributes.iter()
    }

    /// Number of objects tracked by one attribute's index
    pub fn index_len(&self, attribute: &str) -> Option<usize> {
        self.index(attribute).map(FrozenAttributeIndex::len)
    }

    /// Thresholds the indexes were built with
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Operational counters
    pub fn metrics(&self) -> &DexMetrics {
        &self.metrics
    }
}

impl<'a, T> IntoIterator for &'a FrozenDex<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

impl<T> fmt::Debug for FrozenDex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.attributes.iter().map(|a| a.name()).collect();
        f.debug_struct("FrozenDex")
            .field("len", &self.len())
            .field("on", &names)
            .finish()
    }
}
