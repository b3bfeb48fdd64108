//! Containers
//!
//! A container owns its objects and one index per attribute, and answers
//! `find` by combining per-attribute hit sets.
//!
//! # Forms
//!
//! - [`Dex`]: mutable; `add` / `remove` / `update` keep every index in step
//! - [`FrozenDex`]: built once; faster lookups, results in insertion order
//!
//! # Identity
//!
//! Objects are shared as `Arc<T>` and identified by allocation, not by
//! content. Two equal objects in separate `Arc`s are two objects.

mod arena;
mod frozen;
mod mutable;

pub use arena::ObjectArena;
pub use frozen::FrozenDex;
pub use mutable::Dex;

use crate::index::{IndexError, IndexResult};
use crate::value::Attribute;

/// Collect and validate the `on` list: at least one attribute, unique names.
fn collect_attributes<T, A, I>(on: I) -> IndexResult<Vec<Attribute<T>>>
where
    I: IntoIterator<Item = A>,
    A: Into<Attribute<T>>,
{
    let attributes: Vec<Attribute<T>> = on.into_iter().map(Into::into).collect();
    if attributes.is_empty() {
        return Err(IndexError::invalid_construction("Need at least one attribute"));
    }
    for (i, attribute) in attributes.iter().enumerate() {
        if attributes[..i].iter().any(|a| a.name() == attribute.name()) {
            return Err(IndexError::invalid_construction(format!(
                "Attribute '{}' given more than once",
                attribute.name()
            )));
        }
    }
    Ok(attributes)
}
