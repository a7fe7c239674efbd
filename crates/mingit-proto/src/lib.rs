//! # mingit-proto
//!
//! The network-facing half of mingit: pkt-line framing, the smart HTTP
//! upload-pack client, and the packfile decoder that turns a fetched pack
//! into loose objects (resolving ref-deltas along the way).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
pub mod delta;
mod error;
mod pack;
mod pktline;

pub use client::RemoteClient;
pub use error::{ProtoError, Result};
pub use pack::PackReader;
pub use pktline::{PktLine, PktLineReader, PktLineWriter};
