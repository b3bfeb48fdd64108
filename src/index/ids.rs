//! Object identities and the hit-set algebra used to combine lookups
//!
//! Mutable containers combine unordered hash sets. Frozen containers combine
//! sorted identity arrays with linear merges.

use std::cmp::Ordering;
use std::collections::HashSet;

/// Stable identity of a stored object.
///
/// For mutable containers this is an arena slot; for frozen containers it is
/// the object's position in the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Create an identity from a slot or position
    pub fn new(index: usize) -> Self {
        ObjectId(index)
    }

    /// Slot or position this identity refers to
    pub fn index(self) -> usize {
        self.0
    }
}

/// Unordered identity set used by mutable containers
pub type IdSet = HashSet<ObjectId>;

/// Set algebra over per-attribute lookup results.
///
/// `Default` is the empty set.
pub trait HitSet: Sized + Default {
    /// Number of identities
    fn len(&self) -> usize;

    /// Returns true if there are no identities
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identities present in both
    fn intersect(self, other: Self) -> Self;

    /// Identities present in either
    fn union(self, other: Self) -> Self;

    /// Identities in `self` but not in `other`
    fn difference(self, other: &Self) -> Self;
}

impl HitSet for IdSet {
    fn len(&self) -> usize {
        HashSet::len(self)
    }

    fn intersect(self, other: Self) -> Self {
        // probe the larger set with the smaller one
        let (mut small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.retain(|id| large.contains(id));
        small
    }

    fn union(self, other: Self) -> Self {
        let (mut large, small) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        large.extend(small);
        large
    }

    fn difference(mut self, other: &Self) -> Self {
        if other.len() < self.len() {
            for id in other {
                self.remove(id);
            }
        } else {
            self.retain(|id| !other.contains(id));
        }
        self
    }
}

/// Ascending, duplicate-free identity array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedIds(Vec<ObjectId>);

/// Below this size ratio, intersection binary-searches the larger side
/// instead of merging.
const GALLOP_RATIO: usize = 16;

impl SortedIds {
    /// Empty array
    pub fn new() -> Self {
        SortedIds(Vec::new())
    }

    /// Wrap a vector that is already sorted and deduplicated
    pub(crate) fn from_sorted(ids: Vec<ObjectId>) -> Self {
        debug_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        SortedIds(ids)
    }

    /// Sort and deduplicate
    pub fn from_unsorted(mut ids: Vec<ObjectId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        SortedIds(ids)
    }

    /// Borrow as a slice
    pub fn as_slice(&self) -> &[ObjectId] {
        &self.0
    }

    /// Take the inner vector
    pub fn into_vec(self) -> Vec<ObjectId> {
        self.0
    }

    /// Iterate in ascending order
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectId> {
        self.0.iter()
    }

    /// Membership test by bisection
    pub fn contains(&self, id: ObjectId) -> bool {
        self.0.binary_search(&id).is_ok()
    }
}

impl HitSet for SortedIds {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn intersect(self, other: Self) -> Self {
        let (small, large) = if self.0.len() <= other.0.len() {
            (self.0, other.0)
        } else {
            (other.0, self.0)
        };
        if small.len().saturating_mul(GALLOP_RATIO) < large.len() {
            let mut out = small;
            out.retain(|id| large.binary_search(id).is_ok());
            return SortedIds(out);
        }

        let mut out = Vec::with_capacity(small.len());
        let (mut i, mut j) = (0, 0);
        while i < small.len() && j < large.len() {
            match small[i].cmp(&large[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    out.push(small[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        SortedIds(out)
    }

    fn union(self, other: Self) -> Self {
        if self.0.is_empty() {
            return other;
        }
        if other.0.is_empty() {
            return self;
        }
        let (a, b) = (self.0, other.0);
        let mut out = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => {
                    out.push(a[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    out.push(b[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    out.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&a[i..]);
        out.extend_from_slice(&b[j..]);
        SortedIds(out)
    }

    fn difference(self, other: &Self) -> Self {
        if other.0.is_empty() || self.0.is_empty() {
            return self;
        }
        let b = &other.0;
        let mut out = self.0;
        let mut j = 0;
        out.retain(|id| {
            while j < b.len() && b[j] < *id {
                j += 1;
            }
            !(j < b.len() && b[j] == *id)
        });
        SortedIds(out)
    }
}

impl FromIterator<ObjectId> for SortedIds {
    fn from_iter<I: IntoIterator<Item = ObjectId>>(iter: I) -> Self {
        SortedIds::from_unsorted(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SortedIds {
    type Item = &'a ObjectId;
    type IntoIter = std::slice::Iter<'a, ObjectId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
