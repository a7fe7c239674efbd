//! # mingit-store
//!
//! Content-addressed object storage for mingit.
//!
//! An object is a framed, zlib-compressed, SHA-1-addressed immutable byte
//! payload. This crate provides the typed object model (blob, tree, commit,
//! tag), the loose on-disk store at `objects/<hh>/<rest>`, and file-backed
//! reference storage.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod commit;
mod error;
mod loose;
mod object;
mod refs;
mod repo;
mod tree;

pub use commit::{Commit, Signature};
pub use error::{Result, StoreError};
pub use loose::LooseStore;
pub use object::{GitObject, ObjectId, ObjectKind};
pub use refs::{RefStore, Reference};
pub use repo::{Repository, DEFAULT_BRANCH_REF};
pub use tree::{EntryMode, Tree, TreeEntry};
