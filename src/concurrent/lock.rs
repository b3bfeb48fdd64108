//! Reader/writer lock with a selectable admission policy
//!
//! Admission is decided by a small state machine behind a `Mutex` and
//! `Condvar`. The protected value itself sits in a `std::sync::RwLock` that
//! is only ever taken after admission, so it never blocks.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

/// Who goes first when readers and writers contend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockPriority {
    /// Readers enter whenever no writer holds the lock. Writers can starve.
    #[default]
    Readers,
    /// New readers wait while any writer is queued. Readers can starve.
    Writers,
    /// Strict arrival order; consecutive readers share the lock.
    Fair,
}

impl LockPriority {
    /// Lowercase policy name
    pub fn as_str(&self) -> &'static str {
        match self {
            LockPriority::Readers => "readers",
            LockPriority::Writers => "writers",
            LockPriority::Fair => "fair",
        }
    }
}

impl fmt::Display for LockPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct LockState {
    active_readers: usize,
    writer_active: bool,
    queued_writers: usize,
    /// Next ticket handed out (fair policy)
    next_ticket: u64,
    /// Ticket allowed to enter next (fair policy)
    serving: u64,
}

impl LockState {
    fn queue_empty(&self) -> bool {
        self.serving == self.next_ticket
    }

    fn reader_may_enter(&self, priority: LockPriority) -> bool {
        if self.writer_active {
            return false;
        }
        match priority {
            LockPriority::Readers => true,
            LockPriority::Writers => self.queued_writers == 0,
            LockPriority::Fair => self.queue_empty(),
        }
    }

    fn writer_may_enter(&self, priority: LockPriority) -> bool {
        if self.writer_active || self.active_readers > 0 {
            return false;
        }
        priority != LockPriority::Fair || self.queue_empty()
    }
}

/// Reader/writer lock honoring a [`LockPriority`]
pub struct PriorityRwLock<T> {
    priority: LockPriority,
    state: Mutex<LockState>,
    changed: Condvar,
    data: RwLock<T>,
}

impl<T> PriorityRwLock<T> {
    /// Wrap `value` under `priority`
    pub fn new(value: T, priority: LockPriority) -> Self {
        Self {
            priority,
            state: Mutex::new(LockState::default()),
            changed: Condvar::new(),
            data: RwLock::new(value),
        }
    }

    /// Admission policy
    pub fn priority(&self) -> LockPriority {
        self.priority
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, LockState>) -> MutexGuard<'a, LockState> {
        self.changed.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire shared access, blocking until the policy admits this reader
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut state = self.state();
        if self.priority == LockPriority::Fair {
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            while state.serving != ticket || state.writer_active {
                state = self.wait(state);
            }
            state.serving += 1;
        } else {
            while !state.reader_may_enter(self.priority) {
                state = self.wait(state);
            }
        }
        state.active_readers += 1;
        drop(state);
        // Followers in the fair queue may be readers too
        self.changed.notify_all();
        self.read_guard()
    }

    /// Acquire exclusive access, blocking until the policy admits this writer
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut state = self.state();
        state.queued_writers += 1;
        if self.priority == LockPriority::Fair {
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            while state.serving != ticket || state.writer_active || state.active_readers > 0 {
                state = self.wait(state);
            }
            state.serving += 1;
        } else {
            while !state.writer_may_enter(self.priority) {
                state = self.wait(state);
            }
        }
        state.queued_writers -= 1;
        state.writer_active = true;
        drop(state);
        self.write_guard()
    }

    /// Shared access if the policy admits a reader right now
    pub fn try_read(&self) -> Option<ReadGuard<'_, T>> {
        let mut state = self.state();
        if !state.reader_may_enter(self.priority) {
            return None;
        }
        state.active_readers += 1;
        drop(state);
        Some(self.read_guard())
    }

    /// Exclusive access if the policy admits a writer right now
    pub fn try_write(&self) -> Option<WriteGuard<'_, T>> {
        let mut state = self.state();
        if !state.writer_may_enter(self.priority) {
            return None;
        }
        state.writer_active = true;
        drop(state);
        Some(self.write_guard())
    }

    /// Writers currently waiting for admission
    pub fn queued_writers(&self) -> usize {
        self.state().queued_writers
    }

    /// Readers currently holding the lock
    pub fn active_readers(&self) -> usize {
        self.state().active_readers
    }

    /// Unwrap the protected value
    pub fn into_inner(self) -> T {
        self.data.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_guard(&self) -> ReadGuard<'_, T> {
        ReadGuard {
            inner: Some(self.data.read().unwrap_or_else(PoisonError::into_inner)),
            lock: self,
        }
    }

    fn write_guard(&self) -> WriteGuard<'_, T> {
        WriteGuard {
            inner: Some(self.data.write().unwrap_or_else(PoisonError::into_inner)),
            lock: self,
        }
    }

    fn release_read(&self) {
        let mut state = self.state();
        state.active_readers -= 1;
        drop(state);
        self.changed.notify_all();
    }

    fn release_write(&self) {
        let mut state = self.state();
        state.writer_active = false;
        drop(state);
        self.changed.notify_all();
    }
}

impl<T: Default> Default for PriorityRwLock<T> {
    fn default() -> Self {
        Self::new(T::default(), LockPriority::default())
    }
}

impl<T> fmt::Debug for PriorityRwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("PriorityRwLock")
            .field("priority", &self.priority)
            .field("active_readers", &state.active_readers)
            .field("writer_active", &state.writer_active)
            .field("queued_writers", &state.queued_writers)
            .finish()
    }
}

/// Shared access; released on drop
pub struct ReadGuard<'a, T> {
    inner: Option<RwLockReadGuard<'a, T>>,
    lock: &'a PriorityRwLock<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.inner {
            Some(guard) => guard,
            None => unreachable!("read guard used after release"),
        }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        // Release the data lock before admitting anyone else
        self.inner.take();
        self.lock.release_read();
    }
}

/// Exclusive access; released on drop
pub struct WriteGuard<'a, T> {
    inner: Option<RwLockWriteGuard<'a, T>>,
    lock: &'a PriorityRwLock<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.inner {
            Some(guard) => guard,
            None => unreachable!("write guard used after release"),
        }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.inner {
            Some(guard) => guard,
            None => unreachable!("write guard used after release"),
        }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.take();
        self.lock.release_write();
    }
}
