//! Per-attribute index for frozen containers
//!
//! Built once from the full object array. Popular values (more identities
//! than `frozen_extract_threshold`) get their own sorted identity array in a
//! value map; everything else stays in parallel hash-sorted arrays searched
//! by bisection. Every lookup returns ascending [`SortedIds`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::observability::{Logger, Severity};
use crate::value::{Attribute, Record, Value};

use super::bulk::{run_length_encode, HashedEntries, Run};
use super::errors::{IndexError, IndexResult};
use super::ids::{ObjectId, SortedIds};
use super::value_map::range_is_empty;
use super::AttributeLookup;

/// Extracted high-cardinality values
#[derive(Debug)]
enum ExtractedValues {
    Ordered(BTreeMap<Value, SortedIds>),
    Unordered(HashMap<Value, SortedIds>),
}

impl ExtractedValues {
    fn get(&self, value: &Value) -> Option<&SortedIds> {
        match self {
            ExtractedValues::Ordered(tree) => tree.get(value),
            ExtractedValues::Unordered(map) => map.get(value),
        }
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&Value, &SortedIds)> + '_> {
        match self {
            ExtractedValues::Ordered(tree) => Box::new(tree.iter()),
            ExtractedValues::Unordered(map) => Box::new(map.iter()),
        }
    }
}

/// Low-cardinality values in hash order.
#[derive(Debug)]
struct HashBuckets {
    ids: Vec<ObjectId>,
    values: Vec<Value>,
    unique_hashes: Vec<u64>,
    hash_runs: Vec<Run>,
    /// Value groups in ascending value order; empty when unordered
    value_groups: Vec<Run>,
}

impl HashBuckets {
    fn new(entries: HashedEntries, orderable: bool) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        let hash_runs = run_length_encode(&entries.hashes);
        let unique_hashes = hash_runs.iter().map(|r| entries.hashes[r.start]).collect();
        let value_groups = if orderable {
            let mut groups = run_length_encode(&entries.values);
            groups.sort_by(|a, b| entries.values[a.start].cmp(&entries.values[b.start]));
            groups
        } else {
            Vec::new()
        };
        Some(HashBuckets {
            ids: entries.ids,
            values: entries.values,
            unique_hashes,
            hash_runs,
            value_groups,
        })
    }

    fn get(&self, value: &Value) -> &[ObjectId] {
        let Ok(i) = self.unique_hashes.binary_search(&value.hash64()) else {
            return &[];
        };
        let run = self.hash_runs[i];
        let (mut start, mut end) = (run.start, run.end());
        // usually the hash run holds only our value; shrink past collisions
        while start < end && self.values[start] != *value {
            start += 1;
        }
        while end > start && self.values[end - 1] != *value {
            end -= 1;
        }
        &self.ids[start..end]
    }

    fn collect_range(&self, lo: Bound<&Value>, hi: Bound<&Value>, out: &mut Vec<ObjectId>) {
        let groups = &self.value_groups;
        let values = &self.values;
        let start = match lo {
            Bound::Included(b) => groups.partition_point(|g| values[g.start] < *b),
            Bound::Excluded(b) => groups.partition_point(|g| values[g.start] <= *b),
            Bound::Unbounded => 0,
        };
        let end = match hi {
            Bound::Included(b) => groups.partition_point(|g| values[g.start] <= *b),
            Bound::Excluded(b) => groups.partition_point(|g| values[g.start] < *b),
            Bound::Unbounded => groups.len(),
        };
        if start < end {
            for group in &groups[start..end] {
                out.extend_from_slice(&self.ids[group.start..group.end()]);
            }
        }
    }
}

/// Immutable value → sorted identities index for one attribute.
#[derive(Debug)]
pub struct FrozenAttributeIndex {
    name: String,
    none_ids: SortedIds,
    extracted: ExtractedValues,
    buckets: Option<HashBuckets>,
    orderable: bool,
    n_ids: usize,
}

/// True when every value orders against itself and its neighbours in key
/// order. Values that pass can all be ordered against each other.
fn detect_order<'a>(values: impl Iterator<Item = &'a Value>) -> bool {
    let mut values: Vec<&Value> = values.collect();
    if !values.iter().all(|v| v.is_orderable()) {
        return false;
    }
    values.sort();
    values.windows(2).all(|w| w[0].try_cmp(w[1]).is_some())
}

impl FrozenAttributeIndex {
    /// Build from the frozen object array; positions become identities.
    pub fn build<T: Record>(attribute: &Attribute<T>, objects: &[Arc<T>], config: &IndexConfig) -> Self {
        let mut none_ids = Vec::new();
        let mut entries = Vec::with_capacity(objects.len());
        for (pos, obj) in objects.iter().enumerate() {
            match attribute.evaluate(obj) {
                None => {}
                Some(Value::Null) => none_ids.push(ObjectId::new(pos)),
                Some(value) => entries.push((value, ObjectId::new(pos))),
            }
        }
        let n_ids = none_ids.len() + entries.len();

        let mut sorted = HashedEntries::sort_by_hash(entries);
        sorted.group_by_value();
        let groups = run_length_encode(&sorted.values);
        let orderable = detect_order(groups.iter().map(|g| &sorted.values[g.start]));

        let mut keep = vec![true; sorted.len()];
        let mut popular = Vec::new();
        for group in groups.iter().filter(|g| g.len > config.frozen_extract_threshold) {
            keep[group.start..group.end()].iter_mut().for_each(|k| *k = false);
            popular.push((
                sorted.values[group.start].clone(),
                SortedIds::from_sorted(sorted.ids[group.start..group.end()].to_vec()),
            ));
        }
        let extracted = if orderable {
            ExtractedValues::Ordered(popular.into_iter().collect())
        } else {
            ExtractedValues::Unordered(popular.into_iter().collect())
        };
        let remaining = if keep.iter().all(|k| *k) {
            sorted
        } else {
            sorted.retain_marked(&keep)
        };

        let index = FrozenAttributeIndex {
            name: attribute.name().to_string(),
            none_ids: SortedIds::from_sorted(none_ids),
            extracted,
            buckets: HashBuckets::new(remaining, orderable),
            orderable,
            n_ids,
        };
        if Logger::enabled(Severity::Trace) {
            Logger::trace(
                "FROZEN_INDEX_BUILT",
                &[
                    ("attribute", &index.name),
                    ("distinct_values", &groups.len().to_string()),
                    ("identities", &n_ids.to_string()),
                    ("orderable", if orderable { "true" } else { "false" }),
                ],
            );
        }
        index
    }

    /// Identities holding exactly `value`. `Null` reads the None bucket.
    pub fn point_lookup(&self, value: &Value) -> SortedIds {
        if value.is_null() {
            return self.none_ids.clone();
        }
        if let Some(ids) = self.extracted.get(value) {
            return ids.clone();
        }
        match &self.buckets {
            Some(buckets) => SortedIds::from_sorted(buckets.get(value).to_vec()),
            None => SortedIds::new(),
        }
    }

    /// Every identity that has this attribute
    pub fn all_ids(&self) -> SortedIds {
        let mut ids = Vec::with_capacity(self.n_ids);
        ids.extend(self.none_ids.iter().copied());
        if let Some(buckets) = &self.buckets {
            ids.extend_from_slice(&buckets.ids);
        }
        for (_, popular) in self.extracted.iter() {
            ids.extend(popular.iter().copied());
        }
        SortedIds::from_unsorted(ids)
    }

    /// Identities whose value lies within the bounds.
    pub fn range_lookup(&self, lo: Bound<&Value>, hi: Bound<&Value>) -> IndexResult<SortedIds> {
        if !self.orderable {
            return Err(IndexError::incomparable(
                &self.name,
                "values are not orderable; range queries unavailable",
            ));
        }
        for bound in [lo, hi] {
            if let Bound::Included(b) | Bound::Excluded(b) = bound {
                if !self.bound_fits(b) {
                    return Err(IndexError::incomparable(
                        &self.name,
                        format!("range bound of kind '{}' cannot be ordered against indexed values", b.kind()),
                    ));
                }
            }
        }
        let empty = range_is_empty(lo, hi).map_err(|e| IndexError::incomparable(&self.name, e.to_string()))?;
        if empty {
            return Ok(SortedIds::new());
        }

        let mut ids = Vec::new();
        if let ExtractedValues::Ordered(tree) = &self.extracted {
            for (_, popular) in tree.range::<Value, _>((lo, hi)) {
                ids.extend(popular.iter().copied());
            }
        }
        if let Some(buckets) = &self.buckets {
            buckets.collect_range(lo, hi, &mut ids);
        }
        Ok(SortedIds::from_unsorted(ids))
    }

    /// A bound must order against both ends of the value order and the
    /// values it falls between, in the extracted map and in the buckets.
    fn bound_fits(&self, bound: &Value) -> bool {
        if !bound.is_orderable() {
            return false;
        }
        let mut nearby: Vec<&Value> = Vec::with_capacity(8);
        if let ExtractedValues::Ordered(tree) = &self.extracted {
            nearby.extend(tree.keys().next());
            nearby.extend(tree.keys().next_back());
            nearby.extend(tree.range::<Value, _>((Bound::Unbounded, Bound::Excluded(bound))).next_back().map(|(v, _)| v));
            nearby.extend(tree.range::<Value, _>((Bound::Excluded(bound), Bound::Unbounded)).next().map(|(v, _)| v));
        }
        if let Some(buckets) = &self.buckets {
            let groups = &buckets.value_groups;
            let at = groups.partition_point(|g| buckets.values[g.start] < *bound);
            for i in [0, groups.len().wrapping_sub(1), at.wrapping_sub(1), at] {
                if let Some(group) = groups.get(i) {
                    nearby.push(&buckets.values[group.start]);
                }
            }
        }
        nearby.iter().all(|v| bound.try_cmp(v).is_some())
    }

    /// Distinct values, including `Null` when any object holds it
    pub fn all_values(&self) -> HashSet<Value> {
        let mut values: HashSet<Value> = self.extracted.iter().map(|(v, _)| v.clone()).collect();
        if let Some(buckets) = &self.buckets {
            values.extend(buckets.values.iter().cloned());
        }
        if !self.none_ids.as_slice().is_empty() {
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
    pub fn is_orderable(&self) -> bool {
        self.orderable
    }
}

impl AttributeLookup for FrozenAttributeIndex {
    type Hits = SortedIds;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookup_value(&self, value: &Value) -> SortedIds {
        self.point_lookup(value)
    }

    fn lookup_any(&self) -> SortedIds {
        self.all_ids()
    }

    fn lookup_range(&self, lo: Bound<&Value>, hi: Bound<&Value>) -> IndexResult<SortedIds> {
        self.range_lookup(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{HitSet, IndexErrorCode};
    use crate::value::testing::{BadHash, NoSort};
    use serde_json::json;

    fn build(objects: Vec<serde_json::Value>, threshold: usize) -> FrozenAttributeIndex {
        let objects: Vec<Arc<serde_json::Value>> = objects.into_iter().map(Arc::new).collect();
        let config = IndexConfig {
            frozen_extract_threshold: threshold,
            ..Default::default()
        };
        FrozenAttributeIndex::build(&Attribute::field("a"), &objects, &config)
    }

    fn raw(ids: SortedIds) -> Vec<usize> {
        ids.iter().map(|i| i.index()).collect()
    }

    #[test]
    fn test_mixed_cardinality_lookups() {
        // value 0 is popular, the rest are unique
        let objects = (0..20)
            .map(|i| if i % 2 == 0 { json!({"a": 0}) } else { json!({"a": i}) })
            .collect();
        let idx = build(objects, 5);
        assert!(matches!(&idx.extracted, ExtractedValues::Ordered(t) if t.len() == 1));
        assert_eq!(idx.buckets.as_ref().map(|b| b.ids.len()), Some(10));

        assert_eq!(raw(idx.point_lookup(&Value::Int(0))), (0..20).step_by(2).collect::<Vec<_>>());
        assert_eq!(raw(idx.point_lookup(&Value::Int(7))), vec![7]);
        assert!(raw(idx.point_lookup(&Value::Int(8))).is_empty());
        assert_eq!(raw(idx.all_ids()), (0..20).collect::<Vec<_>>());
        assert_eq!(idx.all_values().len(), 11);

        let (lo, hi) = (Value::Int(0), Value::Int(5));
        assert_eq!(
            raw(idx.range_lookup(Bound::Included(&lo), Bound::Included(&hi)).unwrap()),
            vec![0, 1, 2, 3, 4, 5, 6, 8, 10, 12, 14, 16, 18]
        );
        assert_eq!(
            raw(idx.range_lookup(Bound::Excluded(&lo), Bound::Excluded(&hi)).unwrap()),
            vec![1, 3]
        );
    }

    #[test]
    fn test_range_boundaries() {
        let idx = build((0..10).map(|i| json!({"a": i})).collect(), 100);
        let v = |n: i64| Value::Int(n);
        let (six, eight) = (v(6), v(8));
        assert_eq!(raw(idx.range_lookup(Bound::Excluded(&six), Bound::Included(&eight)).unwrap()), vec![7, 8]);
        let (five, six) = (v(5), v(6));
        assert_eq!(raw(idx.range_lookup(Bound::Included(&five), Bound::Excluded(&six)).unwrap()), vec![5]);
        let big = v(999);
        assert!(idx.range_lookup(Bound::Excluded(&big), Bound::Unbounded).unwrap().is_empty());
        let (four, three) = (v(4), v(3));
        assert!(idx.range_lookup(Bound::Included(&four), Bound::Included(&three)).unwrap().is_empty());
        let half = Value::Float(7.5);
        assert_eq!(raw(idx.range_lookup(Bound::Excluded(&half), Bound::Unbounded).unwrap()), vec![8, 9]);
    }

    #[test]
    fn test_null_and_missing() {
        let idx = build(vec![json!({"a": null}), json!({}), json!({"a": 1}), json!({"a": null})], 100);
        assert_eq!(idx.len(), 3);
        assert_eq!(raw(idx.point_lookup(&Value::Null)), vec![0, 3]);
        assert_eq!(raw(idx.all_ids()), vec![0, 2, 3]);
        assert!(idx.all_values().contains(&Value::Null));
    }

    #[test]
    fn test_incomparable_bound() {
        let idx = build((0..3).map(|i| json!({"a": i})).collect(), 100);
        let lol = Value::from("lol");
        let err = idx.range_lookup(Bound::Included(&lol), Bound::Unbounded).unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::IncomparableValue);
    }

    #[test]
    fn test_bound_checked_against_neighbouring_values() {
        let objects: Vec<Arc<serde_json::Value>> = vec![Arc::new(json!(0)), Arc::new(json!(1))];
        let attr = Attribute::derived("pair", |v: &serde_json::Value| {
            v.as_i64().map(|n| {
                if n == 0 {
                    Value::tuple([Value::Int(0), Value::Int(0)])
                } else {
                    Value::tuple([Value::Int(1), Value::from("a")])
                }
            })
        });
        for threshold in [0, 100] {
            let config = IndexConfig {
                frozen_extract_threshold: threshold,
                ..Default::default()
            };
            let idx = FrozenAttributeIndex::build(&attr, &objects, &config);
            assert!(idx.is_orderable());
            let bound = Value::tuple([Value::Int(1), Value::Int(5)]);
            let err = idx.range_lookup(Bound::Included(&bound), Bound::Unbounded).unwrap_err();
            assert_eq!(err.code(), IndexErrorCode::IncomparableValue);
            let low = Value::tuple([Value::Int(0), Value::Int(0)]);
            assert_eq!(raw(idx.range_lookup(Bound::Included(&low), Bound::Included(&low)).unwrap()), vec![0]);
        }
    }

    #[test]
    fn test_heterogeneous_values_are_unordered() {
        let idx = build(vec![json!({"a": 1}), json!({"a": "x"}), json!({"a": 1})], 1);
        assert!(!idx.is_orderable());
        assert!(matches!(&idx.extracted, ExtractedValues::Unordered(_)));
        assert_eq!(raw(idx.point_lookup(&Value::Int(1))), vec![0, 2]);
        assert_eq!(raw(idx.point_lookup(&Value::from("x"))), vec![1]);
        assert!(idx.range_lookup(Bound::Unbounded, Bound::Unbounded).is_err());
    }

    #[test]
    fn test_hash_collisions() {
        let objects: Vec<Arc<serde_json::Value>> =
            [1, 2, 3, 2, 1, 2].iter().map(|n| Arc::new(json!(n))).collect();
        let attr = Attribute::derived("bh", |v: &serde_json::Value| v.as_i64().map(|n| Value::custom(BadHash(n))));
        for threshold in [0, 100] {
            let config = IndexConfig {
                frozen_extract_threshold: threshold,
                ..Default::default()
            };
            let idx = FrozenAttributeIndex::build(&attr, &objects, &config);
            assert_eq!(raw(idx.point_lookup(&Value::custom(BadHash(2)))), vec![1, 3, 5]);
            assert_eq!(raw(idx.point_lookup(&Value::custom(BadHash(3)))), vec![2]);
            assert!(idx.point_lookup(&Value::custom(BadHash(4))).is_empty());
            let two = Value::custom(BadHash(2));
            assert_eq!(raw(idx.range_lookup(Bound::Included(&two), Bound::Unbounded).unwrap()), vec![1, 2, 3, 5]);
        }
    }

    #[test]
    fn test_unsortable_values() {
        let objects: Vec<Arc<serde_json::Value>> = (0..6).map(|n| Arc::new(json!(n))).collect();
        let attr = Attribute::derived("ns", |v: &serde_json::Value| v.as_i64().map(|n| Value::custom(NoSort(n % 3))));
        let idx = FrozenAttributeIndex::build(&attr, &objects, &IndexConfig::default());
        assert!(!idx.is_orderable());
        assert_eq!(raw(idx.point_lookup(&Value::custom(NoSort(1)))), vec![1, 4]);
        assert_eq!(
            idx.range_lookup(Bound::Unbounded, Bound::Unbounded).unwrap_err().code(),
            IndexErrorCode::IncomparableValue
        );
    }
}
