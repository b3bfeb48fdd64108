//! Bulk-build helpers for frozen indexes
//!
//! Values may not be orderable, so entries are sorted by hash instead and
//! equal values are then gathered inside each same-hash run.
//!
//! Workflow:
//! - hash every value, stable-sort the (hash, value, id) triples by hash
//! - inside each run of equal hashes, group equal values together
//! - run-length encode to find each distinct value's span

use crate::value::Value;

use super::ids::ObjectId;

/// Parallel arrays of (hash, value, id), sorted by hash.
#[derive(Debug, Default)]
pub struct HashedEntries {
    pub hashes: Vec<u64>,
    pub values: Vec<Value>,
    pub ids: Vec<ObjectId>,
}

/// A span `[start, start + len)` of equal elements in a sorted array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub len: usize,
}

impl Run {
    /// One past the last position
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

impl HashedEntries {
    /// Hash and stable-sort `entries` by hash.
    pub fn sort_by_hash(entries: Vec<(Value, ObjectId)>) -> Self {
        let mut triples: Vec<(u64, Value, ObjectId)> = entries
            .into_iter()
            .map(|(value, id)| (value.hash64(), value, id))
            .collect();
        triples.sort_by_key(|(hash, _, _)| *hash);

        let mut out = HashedEntries {
            hashes: Vec::with_capacity(triples.len()),
            values: Vec::with_capacity(triples.len()),
            ids: Vec::with_capacity(triples.len()),
        };
        for (hash, value, id) in triples {
            out.hashes.push(hash);
            out.values.push(value);
            out.ids.push(id);
        }
        out
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if there are no entries
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Make equal values contiguous inside every same-hash run, then sort
    /// the ids of each value group ascending.
    ///
    /// Unequal values sharing a hash are partitioned pairwise, O(k²) in the
    /// run length k. Collisions are assumed rare and runs short.
    pub fn group_by_value(&mut self) {
        for run in run_length_encode(&self.hashes) {
            if run.len > 1 {
                self.partition_run(run);
            }
        }
        for group in run_length_encode(&self.values) {
            self.ids[group.start..group.end()].sort_unstable();
        }
    }

    fn partition_run(&mut self, run: Run) {
        let mut i = run.start;
        while i < run.end() {
            let mut next = i + 1;
            for j in (i + 1)..run.end() {
                if self.values[j] == self.values[i] {
                    if j != next {
                        self.values.swap(j, next);
                        self.ids.swap(j, next);
                    }
                    next += 1;
                }
            }
            i = next;
        }
    }

    /// Keep only the entries whose position is marked in `keep`.
    pub fn retain_marked(self, keep: &[bool]) -> Self {
        let mut out = HashedEntries::default();
        let iter = self
            .hashes
            .into_iter()
            .zip(self.values)
            .zip(self.ids)
            .zip(keep.iter().copied());
        for (((hash, value), id), kept) in iter {
            if kept {
                out.hashes.push(hash);
                out.values.push(value);
                out.ids.push(id);
            }
        }
        out
    }
}

/// Spans of equal adjacent elements.
pub fn run_length_encode<K: PartialEq>(items: &[K]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=items.len() {
        if i == items.len() || items[i] != items[start] {
            runs.push(Run {
                start,
                len: i - start,
            });
            start = i;
        }
    }
    runs
}
