//! Object identity and the framed object model.
//!
//! Every object is hashed and stored in its framed form,
//! `"<kind> <size>\0" ++ raw`. The header participates in hashing; the raw
//! bytes are what the kind-specific parsers see.

use crate::{Result, StoreError};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;

/// A 20-byte SHA-1 object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; 20]);

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl ObjectId {
    /// The length of an identifier in bytes.
    pub const LEN: usize = 20;

    /// Wraps raw identifier bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parses the 40-character hex rendering back into an identifier.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = hex::decode(hex)
            .map_err(|_| StoreError::InvalidObject(format!("not a hex id: {:?}", hex)))?;
        Self::try_from(bytes.as_slice())
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the 40-character lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<&[u8]> for ObjectId {
    type Error = StoreError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let mut arr = [0u8; Self::LEN];
        if bytes.len() != arr.len() {
            return Err(StoreError::InvalidObject(format!(
                "expected {} id bytes, got {}",
                arr.len(),
                bytes.len()
            )));
        }
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// The four object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Commit object.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectKind {
    /// Returns the kind tag used in framed headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parses a kind tag.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            _ => Err(StoreError::InvalidObject(format!(
                "unknown object kind: {}",
                s
            ))),
        }
    }

    /// Returns the type code used in pack files.
    #[must_use]
    pub fn pack_code(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
        }
    }

    /// Parses a pack file type code.
    pub fn from_pack_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Commit),
            2 => Ok(Self::Tree),
            3 => Ok(Self::Blob),
            4 => Ok(Self::Tag),
            _ => Err(StoreError::InvalidObject(format!(
                "unknown pack type: {}",
                code
            ))),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the framed form: the header followed by the raw payload, in one
/// buffer, so hashing and storage always see identical bytes.
fn frame(kind: ObjectKind, data: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\0", kind, data.len());
    let mut framed = Vec::with_capacity(header.len() + data.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(data);
    framed
}

/// A git object (blob, tree, commit, or tag).
#[derive(Debug, Clone)]
pub struct GitObject {
    /// The object's identifier, the SHA-1 of its framed form.
    pub id: ObjectId,
    /// The kind of object.
    pub kind: ObjectKind,
    /// The raw object data, without the frame header.
    pub data: Bytes,
}

impl GitObject {
    /// Creates a new object. The identifier is the digest of the framed
    /// form, computed here once and never recomputed.
    pub fn new(kind: ObjectKind, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let id = ObjectId(Sha1::digest(frame(kind, &data)).into());
        Self { id, kind, data }
    }

    /// Creates a blob object from file content.
    pub fn blob(content: impl Into<Bytes>) -> Self {
        Self::new(ObjectKind::Blob, content)
    }

    /// Returns the framed form, `"<kind> <size>\0" ++ data`.
    #[must_use]
    pub fn framed(&self) -> Vec<u8> {
        frame(self.kind, &self.data)
    }

    /// Returns the size of the raw object data.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
