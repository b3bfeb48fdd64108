//! attrdex - in-memory multi-attribute secondary indexes
//!
//! Index a collection of objects on several attributes at once and look them
//! up by exact value, by set membership, by range, or by "has the attribute
//! at all". Results of every term are combined by intersection; an exclude
//! filter subtracts.
//!
//! ```ignore
//! use std::sync::Arc;
//! use attrdex::{Dex, Expr, Filter};
//! use serde_json::json;
//!
//! let mons: Vec<_> = ["Pikachu", "Eevee", "Zapdos"]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, n)| Arc::new(json!({"name": n, "level": 10 * i})))
//!     .collect();
//! let dex = Dex::new(mons, ["name", "level"])?;
//! let hits = dex.query(&Filter::new().with("level", Expr::op(">=", 10)))?;
//! ```
//!
//! Three container forms share one query surface:
//! - [`Dex`]: mutable
//! - [`FrozenDex`]: built once, faster lookups
//! - [`ConcurrentDex`]: a `Dex` behind a policy-selectable reader/writer lock

pub mod concurrent;
pub mod config;
pub mod dex;
pub mod index;
pub mod observability;
pub mod persist;
pub mod query;
pub mod value;

pub use concurrent::{ConcurrentDex, LockPriority};
pub use config::IndexConfig;
pub use dex::{Dex, FrozenDex};
pub use index::{IndexError, IndexErrorCode, IndexResult};
pub use query::{Expr, Filter, Operand, ANY};
pub use value::{Attribute, CustomValue, DynValue, Record, Value};
