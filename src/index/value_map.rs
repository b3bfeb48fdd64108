//! Value → identity-container map for mutable indexes
//!
//! Starts as a BTreeMap so range scans are cheap. If a value turns out not
//! to be orderable against its neighbours, the map degrades to a HashMap
//! once and stays there; range scans then fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::ops::Bound;

use crate::config::IndexConfig;
use crate::value::Value;

use super::container::{Removal, ValueContainer};
use super::ids::ObjectId;

/// Whether the map supports range scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOrder {
    /// Sorted by value
    Ordered,
    /// Hash map fallback; no range scans
    Unordered,
}

/// Why a range scan could not run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// Map degraded to unordered
    Unordered,
    /// A bound cannot be ordered against the stored values or the other bound
    IncomparableBound(&'static str),
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::Unordered => write!(f, "values are not orderable; range queries unavailable"),
            RangeError::IncomparableBound(kind) => {
                write!(f, "range bound of kind '{}' cannot be ordered against indexed values", kind)
            }
        }
    }
}

/// Map from attribute value to the identities holding it.
#[derive(Debug)]
pub enum ValueMap {
    /// Value-sorted map
    Ordered(BTreeMap<Value, ValueContainer>),
    /// Unordered fallback
    Unordered(HashMap<Value, ValueContainer>),
}

impl Default for ValueMap {
    fn default() -> Self {
        ValueMap::Ordered(BTreeMap::new())
    }
}

impl ValueMap {
    /// Creates a new empty, ordered map
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    pub fn order(&self) -> MapOrder {
        match self {
            ValueMap::Ordered(_) => MapOrder::Ordered,
            ValueMap::Unordered(_) => MapOrder::Unordered,
        }
    }

    /// Container for an exact value
    pub fn get(&self, value: &Value) -> Option<&ValueContainer> {
        match self {
            ValueMap::Ordered(tree) => tree.get(value),
            ValueMap::Unordered(map) => map.get(value),
        }
    }

    /// Insert an identity under a value.
    ///
    /// Returns true if this insert degraded the map to unordered.
    pub fn insert(&mut self, value: Value, id: ObjectId, config: &IndexConfig) -> bool {
        let mut degraded = false;
        if let ValueMap::Ordered(tree) = self {
            if !tree.contains_key(&value) && !Self::fits_order(tree, &value) {
                self.degrade();
                degraded = true;
            }
        }

        match self {
            ValueMap::Ordered(tree) => Self::insert_entry(tree.entry(value), id, config),
            ValueMap::Unordered(map) => match map.get_mut(&value) {
                Some(container) => container.add(id, config),
                None => {
                    map.insert(value, ValueContainer::new(id));
                }
            },
        }
        degraded
    }

    fn insert_entry(
        entry: std::collections::btree_map::Entry<'_, Value, ValueContainer>,
        id: ObjectId,
        config: &IndexConfig,
    ) {
        entry
            .and_modify(|c| c.add(id, config))
            .or_insert_with(|| ValueContainer::new(id));
    }

    /// Orderability probe for a new key: it must order against itself and
    /// against the keys it would sit between.
    fn fits_order(tree: &BTreeMap<Value, ValueContainer>, value: &Value) -> bool {
        if !value.is_orderable() {
            return false;
        }
        let below = tree
            .range::<Value, _>((Bound::Unbounded, Bound::Excluded(value)))
            .next_back();
        let above = tree
            .range::<Value, _>((Bound::Excluded(value), Bound::Unbounded))
            .next();
        below.map_or(true, |(k, _)| k.try_cmp(value).is_some())
            && above.map_or(true, |(k, _)| k.try_cmp(value).is_some())
    }

    /// Rebuild every entry into the unordered fallback
    fn degrade(&mut self) {
        if let ValueMap::Ordered(tree) = self {
            let map: HashMap<Value, ValueContainer> = std::mem::take(tree).into_iter().collect();
            *self = ValueMap::Unordered(map);
        }
    }

    /// Remove an identity stored under `value`. Returns true if found.
    pub fn remove(&mut self, value: &Value, id: ObjectId, config: &IndexConfig) -> bool {
        let outcome = match self {
            ValueMap::Ordered(tree) => tree.get_mut(value).map(|c| c.remove(id, config)),
            ValueMap::Unordered(map) => map.get_mut(value).map(|c| c.remove(id, config)),
        };
        match outcome {
            None | Some(Removal::NotFound) => false,
            Some(Removal::Removed) => true,
            Some(Removal::Emptied) => {
                match self {
                    ValueMap::Ordered(tree) => tree.remove(value),
                    ValueMap::Unordered(map) => map.remove(value),
                };
                true
            }
        }
    }

    /// Linear scan for an identity under any value; removes it.
    ///
    /// Returns the value it was found under.
    pub fn remove_anywhere(&mut self, id: ObjectId, config: &IndexConfig) -> Option<Value> {
        let found = match self {
            ValueMap::Ordered(tree) => tree.iter().find(|(_, c)| c.contains(id)).map(|(v, _)| v.clone()),
            ValueMap::Unordered(map) => map.iter().find(|(_, c)| c.contains(id)).map(|(v, _)| v.clone()),
        }?;
        self.remove(&found, id, config);
        Some(found)
    }

    /// Containers whose values fall within the bounds.
    pub fn range(
        &self,
        lo: Bound<&Value>,
        hi: Bound<&Value>,
    ) -> Result<Vec<&ValueContainer>, RangeError> {
        let tree = match self {
            ValueMap::Ordered(tree) => tree,
            ValueMap::Unordered(_) => return Err(RangeError::Unordered),
        };
        let (Some(first), Some(last)) = (tree.keys().next(), tree.keys().next_back()) else {
            return Ok(Vec::new());
        };
        for bound in [lo, hi] {
            if let Bound::Included(b) | Bound::Excluded(b) = bound {
                // ends of the key order plus the keys the bound falls between
                let fits = b.try_cmp(first).is_some()
                    && b.try_cmp(last).is_some()
                    && Self::fits_order(tree, b);
                if !fits {
                    return Err(RangeError::IncomparableBound(b.kind()));
                }
            }
        }
        if range_is_empty(lo, hi)? {
            return Ok(Vec::new());
        }
        Ok(tree.range::<Value, _>((lo, hi)).map(|(_, c)| c).collect())
    }

    /// Distinct values
    pub fn values(&self) -> HashSet<Value> {
        match self {
            ValueMap::Ordered(tree) => tree.keys().cloned().collect(),
            ValueMap::Unordered(map) => map.keys().cloned().collect(),
        }
    }

    /// All containers
    pub fn containers(&self) -> Box<dyn Iterator<Item = &ValueContainer> + '_> {
        match self {
            ValueMap::Ordered(tree) => Box::new(tree.values()),
            ValueMap::Unordered(map) => Box::new(map.values()),
        }
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        match self {
            ValueMap::Ordered(tree) => tree.len(),
            ValueMap::Unordered(map) => map.len(),
        }
    }

    /// Returns true if no values are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns true when the bounds select nothing (`lo > hi`, or `lo == hi`
/// with an exclusive side). BTreeMap::range panics on those inputs.
pub(crate) fn range_is_empty(lo: Bound<&Value>, hi: Bound<&Value>) -> Result<bool, RangeError> {
    let (l, l_incl, h, h_incl) = match (lo, hi) {
        (Bound::Included(l), Bound::Included(h)) => (l, true, h, true),
        (Bound::Included(l), Bound::Excluded(h)) => (l, true, h, false),
        (Bound::Excluded(l), Bound::Included(h)) => (l, false, h, true),
        (Bound::Excluded(l), Bound::Excluded(h)) => (l, false, h, false),
        _ => return Ok(false),
    };
    match l.try_cmp(h) {
        None => Err(RangeError::IncomparableBound(h.kind())),
        Some(std::cmp::Ordering::Greater) => Ok(true),
        Some(std::cmp::Ordering::Equal) => Ok(!(l_incl && h_incl)),
        Some(std::cmp::Ordering::Less) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::testing::NoSort;

    fn id(n: usize) -> ObjectId {
        ObjectId::new(n)
    }

    fn filled(n: i64) -> ValueMap {
        let cfg = IndexConfig::default();
        let mut map = ValueMap::new();
        for i in 0..n {
            map.insert(Value::Int(i), id(i as usize), &cfg);
        }
        map
    }

    fn range_ids(map: &ValueMap, lo: Bound<&Value>, hi: Bound<&Value>) -> Vec<usize> {
        let mut out: Vec<usize> = map
            .range(lo, hi)
            .unwrap()
            .into_iter()
            .flat_map(|c| c.iter().map(|i| i.index()).collect::<Vec<_>>())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_insert_and_get() {
        let cfg = IndexConfig::default();
        let mut map = ValueMap::new();
        map.insert(Value::from("alice"), id(1), &cfg);
        map.insert(Value::from("alice"), id(2), &cfg);
        map.insert(Value::from("bob"), id(3), &cfg);

        assert_eq!(map.get(&Value::from("alice")).map(|c| c.len()), Some(2));
        assert_eq!(map.get(&Value::from("bob")).map(|c| c.len()), Some(1));
        assert!(map.get(&Value::from("carol")).is_none());
        assert_eq!(map.order(), MapOrder::Ordered);
    }

    #[test]
    fn test_range_bounds() {
        let map = filled(10);
        let (six, eight) = (Value::Int(6), Value::Int(8));
        assert_eq!(range_ids(&map, Bound::Excluded(&six), Bound::Included(&eight)), vec![7, 8]);
        let (five, six) = (Value::Int(5), Value::Int(6));
        assert_eq!(range_ids(&map, Bound::Included(&five), Bound::Excluded(&six)), vec![5]);
        let big = Value::Int(999);
        assert!(range_ids(&map, Bound::Excluded(&big), Bound::Unbounded).is_empty());
    }

    #[test]
    fn test_inverted_and_degenerate_ranges_are_empty() {
        let map = filled(10);
        let (four, three) = (Value::Int(4), Value::Int(3));
        assert!(range_ids(&map, Bound::Excluded(&four), Bound::Excluded(&three)).is_empty());
        let six = Value::Int(6);
        assert!(range_ids(&map, Bound::Excluded(&six), Bound::Included(&six)).is_empty());
        assert_eq!(range_ids(&map, Bound::Included(&six), Bound::Included(&six)), vec![6]);
    }

    #[test]
    fn test_incomparable_bound() {
        let map = filled(3);
        let lol = Value::from("lol");
        assert_eq!(
            map.range(Bound::Unbounded, Bound::Excluded(&lol)).unwrap_err(),
            RangeError::IncomparableBound("str")
        );
    }

    #[test]
    fn test_bound_checked_against_neighbouring_keys() {
        let cfg = IndexConfig::default();
        let mut map = ValueMap::new();
        map.insert(Value::tuple([Value::Int(0), Value::Int(0)]), id(0), &cfg);
        map.insert(Value::tuple([Value::Int(1), Value::from("a")]), id(1), &cfg);
        assert_eq!(map.order(), MapOrder::Ordered);

        // orders against (0, 0) but not against (1, "a")
        let bound = Value::tuple([Value::Int(1), Value::Int(5)]);
        assert_eq!(
            map.range(Bound::Included(&bound), Bound::Unbounded).unwrap_err(),
            RangeError::IncomparableBound("tuple")
        );
        let low = Value::tuple([Value::Int(0), Value::Int(0)]);
        assert_eq!(range_ids(&map, Bound::Included(&low), Bound::Included(&low)), vec![0]);
    }

    #[test]
    fn test_range_after_mixed_inserts() {
        let cfg = IndexConfig::default();
        let mut map = ValueMap::new();
        assert!(!map.insert(Value::Int(1), id(0), &cfg));
        assert!(map.insert(Value::from("a"), id(1), &cfg));
        let two = Value::Int(2);
        assert_eq!(
            map.range(Bound::Unbounded, Bound::Excluded(&two)).unwrap_err(),
            RangeError::Unordered
        );
    }

    #[test]
    fn test_heterogeneous_insert_degrades() {
        let cfg = IndexConfig::default();
        let mut map = filled(10);
        assert!(map.insert(Value::from("lol"), id(10), &cfg));
        assert_eq!(map.order(), MapOrder::Unordered);
        assert_eq!(map.len(), 11);
        assert!(map.get(&Value::Int(3)).is_some());
        assert_eq!(
            map.range(Bound::Unbounded, Bound::Unbounded).unwrap_err(),
            RangeError::Unordered
        );
    }

    #[test]
    fn test_unorderable_first_value() {
        let cfg = IndexConfig::default();
        let mut map = ValueMap::new();
        assert!(map.insert(Value::custom(NoSort(1)), id(0), &cfg));
        assert_eq!(map.order(), MapOrder::Unordered);
        assert!(map.get(&Value::custom(NoSort(1))).is_some());
    }

    #[test]
    fn test_remove_and_remove_anywhere() {
        let cfg = IndexConfig::default();
        let mut map = filled(5);
        assert!(map.remove(&Value::Int(2), id(2), &cfg));
        assert!(!map.remove(&Value::Int(2), id(2), &cfg));
        assert_eq!(map.len(), 4);

        assert_eq!(map.remove_anywhere(id(4), &cfg), Some(Value::Int(4)));
        assert_eq!(map.remove_anywhere(id(4), &cfg), None);
        assert_eq!(map.len(), 3);
    }
}
