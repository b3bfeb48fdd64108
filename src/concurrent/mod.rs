//! Shared-access wrapper
//!
//! [`ConcurrentDex`] puts a mutable container behind a reader/writer lock
//! whose contention policy is picked at construction:
//!
//! | Policy    | New reader while a writer waits | Starvation risk |
//! |-----------|---------------------------------|-----------------|
//! | `Readers` | enters                          | writers         |
//! | `Writers` | waits                           | readers         |
//! | `Fair`    | waits its turn                  | none            |

mod dex;
mod lock;

pub use dex::ConcurrentDex;
pub use lock::{LockPriority, PriorityRwLock, ReadGuard, WriteGuard};
