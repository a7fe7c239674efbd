//! # mingit-worktree
//!
//! The two projections between a working directory and the object graph:
//! snapshotting a directory into blob and tree objects (`write-tree`), and
//! materializing a commit's tree as files on disk (checkout).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checkout;
mod error;
mod snapshot;

pub use checkout::checkout_commit;
pub use error::{Result, WorktreeError};
pub use snapshot::write_tree;
