//! Per-container counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics: a concurrent container bumps them under a read lock

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one container
#[derive(Debug, Default)]
pub struct DexMetrics {
    /// Objects newly added
    objects_added: AtomicU64,
    /// Objects removed (including the remove half of update)
    objects_removed: AtomicU64,
    /// Successful finds
    finds_executed: AtomicU64,
    /// Finds rejected with an error
    finds_rejected: AtomicU64,
    /// Removes that needed the linear-scan fallback
    stale_removes: AtomicU64,
    /// Indexes that degraded to unordered maps
    order_degradations: AtomicU64,
}

impl DexMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment objects added
    pub fn increment_added(&self) {
        self.objects_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment objects removed
    pub fn increment_removed(&self) {
        self.objects_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a find
    pub fn record_find(&self, ok: bool) {
        if ok {
            self.finds_executed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.finds_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Increment stale-remove fallbacks
    pub fn increment_stale_removes(&self) {
        self.stale_removes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment order degradations
    pub fn increment_order_degradations(&self) {
        self.order_degradations.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            objects_added: self.objects_added.load(Ordering::Relaxed),
            objects_removed: self.objects_removed.load(Ordering::Relaxed),
            finds_executed: self.finds_executed.load(Ordering::Relaxed),
            finds_rejected: self.finds_rejected.load(Ordering::Relaxed),
            stale_removes: self.stale_removes.load(Ordering::Relaxed),
            order_degradations: self.order_degradations.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of [`DexMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub objects_added: u64,
    pub objects_removed: u64,
    pub finds_executed: u64,
    pub finds_rejected: u64,
    pub stale_removes: u64,
    pub order_degradations: u64,
}
