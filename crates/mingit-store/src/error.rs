//! Store error types.

use thiserror::Error;

/// Errors that can occur during object and reference storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object not found in the store.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Invalid object format.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// A stored object's content does not hash to its claimed identifier.
    #[error("object {expected} hashes to {actual}")]
    IdMismatch {
        /// The identifier the object was stored under.
        expected: String,
        /// The identifier its content actually hashes to.
        actual: String,
    },

    /// Reference not found.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// Invalid reference name or contents.
    #[error("invalid reference: {0}")]
    InvalidRef(String),

    /// The path is not a mingit repository.
    #[error("not a git repository: {0}")]
    NotARepository(String),

    /// Compression or decompression error.
    #[error("compression error: {0}")]
    Compression(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
