//! Worktree error types.

use thiserror::Error;

/// Errors that can occur while projecting between disk and objects.
#[derive(Debug, Error)]
pub enum WorktreeError {
    /// A directory entry kind outside {regular, executable, symlink, dir}.
    #[error("unsupported directory entry: {0}")]
    UnsupportedEntry(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] mingit_store::StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for worktree operations.
pub type Result<T> = std::result::Result<T, WorktreeError>;
