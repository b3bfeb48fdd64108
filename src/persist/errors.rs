//! # Persistence Errors

use thiserror::Error;

use crate::index::IndexError;

/// Result type for save/load
pub type PersistResult<T> = Result<T, PersistError>;

/// Save/load errors
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading or writing the underlying file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The document lists a derived attribute the caller did not supply
    #[error("Derived attribute '{0}' must be supplied at load")]
    MissingAttribute(String),

    /// The caller supplied an attribute the document does not list
    #[error("Attribute '{0}' is not part of the saved container")]
    UnknownAttribute(String),

    /// Rebuilding the container failed
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

impl PersistError {
    /// Returns true if the caller's attribute list caused the failure
    pub fn is_attribute_mismatch(&self) -> bool {
        matches!(
            self,
            PersistError::MissingAttribute(_) | PersistError::UnknownAttribute(_)
        )
    }
}
