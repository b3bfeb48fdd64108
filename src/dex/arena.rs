//! Object arena for mutable containers
//!
//! Objects live in slots; a slot index is the object's [`ObjectId`]. Freed
//! slots are reused. Caller-held `Arc`s are resolved to identities through
//! their pointer address, which stays unique while the arena holds a clone.

use std::collections::HashMap;
use std::sync::Arc;

use crate::index::{IdSet, ObjectId};

/// Address of the shared allocation, used as the identity key
pub(crate) fn address<T>(obj: &Arc<T>) -> usize {
    Arc::as_ptr(obj) as usize
}

/// Slab of stored objects
#[derive(Debug)]
pub struct ObjectArena<T> {
    slots: Vec<Option<Arc<T>>>,
    free: Vec<usize>,
    by_address: HashMap<usize, ObjectId>,
}

impl<T> Default for ObjectArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_address: HashMap::new(),
        }
    }
}

impl<T> ObjectArena<T> {
    /// Empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object. Returns its identity and whether it was newly stored.
    pub fn insert(&mut self, obj: Arc<T>) -> (ObjectId, bool) {
        let addr = address(&obj);
        if let Some(id) = self.by_address.get(&addr) {
            return (*id, false);
        }
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(obj);
                ObjectId::new(slot)
            }
            None => {
                self.slots.push(Some(obj));
                ObjectId::new(self.slots.len() - 1)
            }
        };
        self.by_address.insert(addr, id);
        (id, true)
    }

    /// Identity of a stored object
    pub fn id_of(&self, obj: &Arc<T>) -> Option<ObjectId> {
        self.by_address.get(&address(obj)).copied()
    }

    /// Object stored under `id`
    pub fn get(&self, id: ObjectId) -> Option<&Arc<T>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Remove and return the object under `id`, freeing its slot
    pub fn remove(&mut self, id: ObjectId) -> Option<Arc<T>> {
        let obj = self.slots.get_mut(id.index())?.take()?;
        self.by_address.remove(&address(&obj));
        self.free.push(id.index());
        Some(obj)
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    /// Stored objects in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Arc<T>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|obj| (ObjectId::new(i), obj)))
    }

    /// Every stored identity
    pub fn ids(&self) -> IdSet {
        self.by_address.values().copied().collect()
    }
}
