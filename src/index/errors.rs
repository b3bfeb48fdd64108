//! Index and query error types
//!
//! Error codes:
//! - DEX_ATTRIBUTE_NOT_INDEXED
//! - DEX_OBJECT_NOT_PRESENT
//! - DEX_INCOMPARABLE_VALUE
//! - DEX_INVALID_EXPRESSION
//! - DEX_IMMUTABLE_CONTAINER
//! - DEX_INVALID_CONSTRUCTION
//!
//! All of these are caller errors. None are retried internally.

use std::fmt;

/// Index error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Query names an attribute with no index
    AttributeNotIndexed,
    /// remove/update of an object that is not stored
    ObjectNotPresent,
    /// Ordering requested on values that cannot be ordered
    IncomparableValue,
    /// Malformed query expression
    InvalidExpression,
    /// Mutation attempted on a frozen container
    ImmutableContainer,
    /// Bad constructor arguments or configuration
    InvalidConstruction,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::AttributeNotIndexed => "DEX_ATTRIBUTE_NOT_INDEXED",
            IndexErrorCode::ObjectNotPresent => "DEX_OBJECT_NOT_PRESENT",
            IndexErrorCode::IncomparableValue => "DEX_INCOMPARABLE_VALUE",
            IndexErrorCode::InvalidExpression => "DEX_INVALID_EXPRESSION",
            IndexErrorCode::ImmutableContainer => "DEX_IMMUTABLE_CONTAINER",
            IndexErrorCode::InvalidConstruction => "DEX_INVALID_CONSTRUCTION",
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    /// Error code
    code: IndexErrorCode,
    /// Human-readable message
    message: String,
    /// Attribute involved, if any
    attribute: Option<String>,
}

impl IndexError {
    /// Query referenced attributes that have no index
    pub fn attribute_not_indexed(names: &[&str]) -> Self {
        Self {
            code: IndexErrorCode::AttributeNotIndexed,
            message: format!(
                "Cannot find on {:?}; attributes must be specified on creation",
                names
            ),
            attribute: names.first().map(|n| n.to_string()),
        }
    }

    /// Object is not stored in the container
    pub fn object_not_present() -> Self {
        Self {
            code: IndexErrorCode::ObjectNotPresent,
            message: "Object is not present in the container".to_string(),
            attribute: None,
        }
    }

    /// Values could not be ordered for a range query
    pub fn incomparable(attribute: &str, reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::IncomparableValue,
            message: format!("Attribute '{}': {}", attribute, reason.into()),
            attribute: Some(attribute.to_string()),
        }
    }

    /// Malformed query expression
    pub fn invalid_expression(attribute: &str, reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::InvalidExpression,
            message: format!("Attribute '{}': {}", attribute, reason.into()),
            attribute: Some(attribute.to_string()),
        }
    }

    /// Mutation on a frozen container
    pub fn immutable(operation: &str) -> Self {
        Self {
            code: IndexErrorCode::ImmutableContainer,
            message: format!("Cannot {} on a frozen container", operation),
            attribute: None,
        }
    }

    /// Bad constructor arguments
    pub fn invalid_construction(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::InvalidConstruction,
            message: reason.into(),
            attribute: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the attribute if applicable
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
