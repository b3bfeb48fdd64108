//! Adaptive identity container for one attribute value
//!
//! Most values are shared by a handful of objects, where a hash set costs far
//! more memory than the identities it holds. The container starts as a single
//! identity, grows into a small array, and becomes a hash set only past
//! `array_max`. It shrinks back below `set_min`, which is lower than
//! `array_max` so that a value hovering at the boundary does not thrash.

use crate::config::IndexConfig;

use super::ids::{IdSet, ObjectId, SortedIds};

/// Identities sharing one attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueContainer {
    /// Exactly one identity
    One(ObjectId),
    /// 2..=array_max identities, unordered
    Few(Vec<ObjectId>),
    /// More than fit in the small array
    Many(IdSet),
}

/// Outcome of [`ValueContainer::remove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Identity was not in the container
    NotFound,
    /// Identity removed, container still has members
    Removed,
    /// Identity was the last member; the owner must drop the container
    Emptied,
}

impl ValueContainer {
    /// Container holding a single identity
    pub fn new(id: ObjectId) -> Self {
        ValueContainer::One(id)
    }

    /// Add an identity. Adding a present identity is a no-op.
    pub fn add(&mut self, id: ObjectId, config: &IndexConfig) {
        match self {
            ValueContainer::One(existing) => {
                if *existing != id {
                    *self = ValueContainer::Few(vec![*existing, id]);
                }
            }
            ValueContainer::Few(ids) => {
                if ids.contains(&id) {
                    return;
                }
                if ids.len() >= config.array_max {
                    let mut set: IdSet = ids.drain(..).collect();
                    set.insert(id);
                    *self = ValueContainer::Many(set);
                } else {
                    ids.push(id);
                }
            }
            ValueContainer::Many(set) => {
                set.insert(id);
            }
        }
    }

    /// Remove an identity, demoting the representation when it shrinks.
    pub fn remove(&mut self, id: ObjectId, config: &IndexConfig) -> Removal {
        match self {
            ValueContainer::One(existing) => {
                if *existing == id {
                    Removal::Emptied
                } else {
                    Removal::NotFound
                }
            }
            ValueContainer::Few(ids) => {
                let Some(pos) = ids.iter().position(|x| *x == id) else {
                    return Removal::NotFound;
                };
                ids.swap_remove(pos);
                if ids.len() == 1 {
                    *self = ValueContainer::One(ids[0]);
                }
                Removal::Removed
            }
            ValueContainer::Many(set) => {
                if !set.remove(&id) {
                    return Removal::NotFound;
                }
                match set.len() {
                    0 => return Removal::Emptied,
                    1 => {
                        let only = set.iter().copied().next().unwrap_or(id);
                        *self = ValueContainer::One(only);
                    }
                    n if n < config.set_min => {
                        *self = ValueContainer::Few(set.drain().collect());
                    }
                    _ => {}
                }
                Removal::Removed
            }
        }
    }

    /// Membership test
    pub fn contains(&self, id: ObjectId) -> bool {
        match self {
            ValueContainer::One(existing) => *existing == id,
            ValueContainer::Few(ids) => ids.contains(&id),
            ValueContainer::Many(set) => set.contains(&id),
        }
    }

    /// Number of identities
    pub fn len(&self) -> usize {
        match self {
            ValueContainer::One(_) => 1,
            ValueContainer::Few(ids) => ids.len(),
            ValueContainer::Many(set) => set.len(),
        }
    }

    /// Iterate identities in no particular order
    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        let (one, few, many) = match self {
            ValueContainer::One(id) => (Some(*id), None, None),
            ValueContainer::Few(ids) => (None, Some(ids.iter().copied()), None),
            ValueContainer::Many(set) => (None, None, Some(set.iter().copied())),
        };
        one.into_iter()
            .chain(few.into_iter().flatten())
            .chain(many.into_iter().flatten())
    }

    /// Copy identities into a hash set
    pub fn extend_into(&self, out: &mut IdSet) {
        out.extend(self.iter());
    }

    /// Identities as a hash set
    pub fn to_id_set(&self) -> IdSet {
        match self {
            ValueContainer::Many(set) => set.clone(),
            _ => self.iter().collect(),
        }
    }

    /// Identities in ascending order
    pub fn to_sorted(&self) -> SortedIds {
        SortedIds::from_unsorted(self.iter().collect())
    }
}
