//! Attribute accessors

use std::fmt;
use std::sync::Arc;

use super::{Record, Value};

/// Function computing a derived attribute. `None` means "missing".
pub type DerivedFn<T> = Arc<dyn Fn(&T) -> Option<Value> + Send + Sync>;

/// How to read one indexed attribute from an object.
///
/// The attribute's name is the key used by queries and `get_values`.
pub enum Attribute<T> {
    /// Named field or key lookup through [`Record`]
    Field(String),
    /// Value computed by a function
    Derived {
        /// Query name of the attribute
        name: String,
        /// Accessor
        func: DerivedFn<T>,
    },
}

impl<T> Attribute<T> {
    /// Create a field attribute
    pub fn field(name: impl Into<String>) -> Self {
        Attribute::Field(name.into())
    }

    /// Create a derived attribute
    pub fn derived<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&T) -> Option<Value> + Send + Sync + 'static,
    {
        Attribute::Derived {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The attribute's query name
    pub fn name(&self) -> &str {
        match self {
            Attribute::Field(name) => name,
            Attribute::Derived { name, .. } => name,
        }
    }

    /// Returns true for derived attributes
    pub fn is_derived(&self) -> bool {
        matches!(self, Attribute::Derived { .. })
    }
}

impl<T: Record> Attribute<T> {
    /// Evaluate against an object. `None` means the attribute is missing.
    pub fn evaluate(&self, obj: &T) -> Option<Value> {
        match self {
            Attribute::Field(name) => obj.field(name),
            Attribute::Derived { func, .. } => func(obj),
        }
    }
}

impl<T> Clone for Attribute<T> {
    fn clone(&self) -> Self {
        match self {
            Attribute::Field(name) => Attribute::Field(name.clone()),
            Attribute::Derived { name, func } => Attribute::Derived {
                name: name.clone(),
                func: Arc::clone(func),
            },
        }
    }
}

impl<T> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Field(name) => write!(f, "Field({:?})", name),
            Attribute::Derived { name, .. } => write!(f, "Derived({:?})", name),
        }
    }
}

impl<T> From<&str> for Attribute<T> {
    fn from(name: &str) -> Self {
        Attribute::Field(name.to_string())
    }
}

impl<T> From<String> for Attribute<T> {
    fn from(name: String) -> Self {
        Attribute::Field(name)
    }
}
