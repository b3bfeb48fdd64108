//! Per-attribute indexes
//!
//! Each indexed attribute gets one index mapping value → identities, plus a
//! bucket for `Null`. Objects missing the attribute are not tracked.
//!
//! # Forms
//!
//! - [`MutableAttributeIndex`]: adaptive [`ValueContainer`]s in a value map
//!   that starts ordered and degrades to unordered on incomparable values
//! - [`FrozenAttributeIndex`]: built once in bulk; sorted identity arrays
//!
//! # Invariants
//!
//! - An index's `len()` equals the number of objects holding the attribute
//! - Range lookups require mutually orderable values
//! - Frozen lookups return ascending identities

mod bulk;
mod container;
mod errors;
mod frozen;
mod ids;
mod mutable;
mod value_map;

pub use container::{Removal, ValueContainer};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use frozen::FrozenAttributeIndex;
pub use ids::{HitSet, IdSet, ObjectId, SortedIds};
pub use mutable::{MutableAttributeIndex, RemoveOutcome};
pub use value_map::{MapOrder, ValueMap};

use std::ops::Bound;

use crate::value::Value;

/// Lookups the query evaluator needs from one attribute index.
pub trait AttributeLookup {
    /// Identity collection returned by lookups
    type Hits: HitSet;

    /// Attribute name
    fn name(&self) -> &str;

    /// Identities holding exactly `value`
    fn lookup_value(&self, value: &Value) -> Self::Hits;

    /// Identities holding any value, `Null` included
    fn lookup_any(&self) -> Self::Hits;

    /// Identities whose value lies within the bounds
    fn lookup_range(&self, lo: Bound<&Value>, hi: Bound<&Value>) -> IndexResult<Self::Hits>;
}
