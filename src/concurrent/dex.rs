//! Thread-safe mutable container

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::dex::Dex;
use crate::index::IndexResult;
use crate::query::Filter;
use crate::value::{Attribute, Record, Value};

use super::lock::{LockPriority, PriorityRwLock, ReadGuard, WriteGuard};

/// A [`Dex`] shared between threads.
///
/// Lookups take the read lock; `add`, `remove` and `update` take the write
/// lock. Use [`ConcurrentDex::read`] or [`ConcurrentDex::write`] to run
/// several operations under one acquisition.
pub struct ConcurrentDex<T> {
    inner: PriorityRwLock<Dex<T>>,
}

impl<T: Record> ConcurrentDex<T> {
    /// Create with the default (readers-first) lock policy
    pub fn new<I, A, O>(objects: I, on: O) -> IndexResult<Self>
    where
        I: IntoIterator<Item = Arc<T>>,
        O: IntoIterator<Item = A>,
        A: Into<Attribute<T>>,
    {
        Self::with_priority(objects, on, LockPriority::default())
    }

    /// Create with an explicit lock policy
    pub fn with_priority<I, A, O>(objects: I, on: O, priority: LockPriority) -> IndexResult<Self>
    where
        I: IntoIterator<Item = Arc<T>>,
        O: IntoIterator<Item = A>,
        A: Into<Attribute<T>>,
    {
        Self::with_config(objects, on, IndexConfig::default(), priority)
    }

    /// Create with explicit thresholds and lock policy
    pub fn with_config<I, A, O>(
        objects: I,
        on: O,
        config: IndexConfig,
        priority: LockPriority,
    ) -> IndexResult<Self>
    where
        I: IntoIterator<Item = Arc<T>>,
        O: IntoIterator<Item = A>,
        A: Into<Attribute<T>>,
    {
        let dex = Dex::with_config(objects, on, config)?;
        Ok(Self::from_dex(dex, priority))
    }

    /// Add an object. Returns true if it was not already stored.
    pub fn add(&self, obj: Arc<T>) -> bool {
        self.write().add(obj)
    }

    /// Remove an object
    pub fn remove(&self, obj: &Arc<T>) -> IndexResult<()> {
        self.write().remove(obj)
    }

    /// Re-index an object after it changed
    pub fn update(&self, obj: &Arc<T>) -> IndexResult<()> {
        self.write().update(obj)
    }

    /// See [`Dex::find`]
    pub fn find(&self, matching: &Filter, excluding: &Filter) -> IndexResult<Vec<Arc<T>>> {
        self.read().find(matching, excluding)
    }

    /// See [`Dex::query`]
    pub fn query(&self, filter: &Filter) -> IndexResult<Vec<Arc<T>>> {
        self.read().query(filter)
    }

    /// See [`Dex::get_values`]
    pub fn get_values(&self, attribute: &str) -> IndexResult<HashSet<Value>> {
        self.read().get_values(attribute)
    }
}

impl<T> ConcurrentDex<T> {
    /// Share an existing container
    pub fn from_dex(dex: Dex<T>, priority: LockPriority) -> Self {
        Self {
            inner: PriorityRwLock::new(dex, priority),
        }
    }

    /// Lock policy chosen at construction
    pub fn priority(&self) -> LockPriority {
        self.inner.priority()
    }

    /// Hold the read lock
    pub fn read(&self) -> ReadGuard<'_, Dex<T>> {
        self.inner.read()
    }

    /// Hold the write lock
    pub fn write(&self) -> WriteGuard<'_, Dex<T>> {
        self.inner.write()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns true if this exact object is stored
    pub fn contains(&self, obj: &Arc<T>) -> bool {
        self.read().contains(obj)
    }

    /// Copy of the stored objects, taken under the read lock
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.read().snapshot()
    }

    /// Release the lock wrapper
    pub fn into_inner(self) -> Dex<T> {
        self.inner.into_inner()
    }
}

impl<T> fmt::Debug for ConcurrentDex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentDex")
            .field("priority", &self.priority())
            .field("dex", &*self.read())
            .finish()
    }
}
