//! Observability for attrdex
//!
//! - Structured logging (one JSON object per line)
//! - Per-container counters
//! - Scope-based begin/complete logging for bulk builds
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on index state
//! 3. No background threads
//! 4. Quiet by default: only WARN and above are emitted unless lowered
//!
//! # Usage
//!
//! ```ignore
//! use attrdex::observability::{Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! Logger::info("DEX_LOADED", &[("objects", "42")]);
//! ```

mod logger;
mod metrics;
mod scope;

pub use logger::{Logger, Severity};
pub use metrics::{DexMetrics, MetricsSnapshot};
pub use scope::ObservationScope;
