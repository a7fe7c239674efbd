//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while talking to a remote or decoding a pack.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Invalid pack file format.
    #[error("invalid pack file: {0}")]
    InvalidPack(String),

    /// A pack entry kind this implementation does not handle.
    #[error("unsupported pack object: {0}")]
    UnsupportedPackObject(String),

    /// A delta's base is neither in the pack nor in the loose store.
    #[error("delta base not found: {0}")]
    MissingBase(String),

    /// Invalid delta instruction stream.
    #[error("malformed delta: {0}")]
    MalformedDelta(String),

    /// Invalid pkt-line framing.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// The remote broke the upload-pack dialogue.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote answered with a non-success HTTP status.
    #[error("unexpected HTTP status: {0}")]
    HttpStatus(u16),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] mingit_store::StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtoError>;
