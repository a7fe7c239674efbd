//! Loose object I/O.
//!
//! Each object lives in its framed form, zlib-compressed, at
//! `<root>/<hh>/<rest>` where `hh` is the first two hex digits of its
//! identifier. Writes are content-addressed and idempotent; objects are
//! never deleted.

use crate::{GitObject, ObjectId, ObjectKind, Result, StoreError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// The on-disk loose object store.
#[derive(Debug, Clone)]
pub struct LooseStore {
    root: PathBuf,
}

impl LooseStore {
    /// Creates a store rooted at an objects directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the objects directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    /// Persists an object. Re-writing an existing object is a no-op; two
    /// writers of the same id produce identical bytes and race harmlessly.
    pub fn put(&self, object: &GitObject) -> Result<()> {
        let path = self.object_path(&object.id);
        if path.exists() {
            return Ok(());
        }
        if let Some(dir) = path.parent() {
            // Tolerates the directory already existing, including one
            // created concurrently.
            fs::create_dir_all(dir)?;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&object.framed())
            .map_err(|e| StoreError::Compression(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| StoreError::Compression(e.to_string()))?;

        fs::write(&path, compressed)?;
        tracing::trace!(id = %object.id, kind = %object.kind, "stored loose object");
        Ok(())
    }

    /// Reads an object, returning its kind and raw (unframed) data.
    ///
    /// The content is re-hashed on the way in; an object whose computed id
    /// differs from the id it is stored under is reported as corrupt.
    pub fn get(&self, id: &ObjectId) -> Result<GitObject> {
        let framed = self.read_decompressed(id)?;
        let (kind, data) = split_framed(&framed)?;
        let object = GitObject::new(kind, data.to_vec());
        if object.id != *id {
            return Err(StoreError::IdMismatch {
                expected: id.to_hex(),
                actual: object.id.to_hex(),
            });
        }
        Ok(object)
    }

    /// Reads an object's framed form, header included.
    pub fn get_framed(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let framed = self.read_decompressed(id)?;
        split_framed(&framed)?;
        Ok(framed)
    }

    /// Returns true if the object is present.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).exists()
    }

    fn read_decompressed(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_hex()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut framed = Vec::new();
        decoder
            .read_to_end(&mut framed)
            .map_err(|e| StoreError::Compression(e.to_string()))?;
        Ok(framed)
    }
}

/// Splits a framed object into its kind and raw payload, validating the
/// `"<kind> <size>\0"` header.
fn split_framed(framed: &[u8]) -> Result<(ObjectKind, &[u8])> {
    let nul = framed
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StoreError::InvalidObject("missing NUL in object header".to_string()))?;
    let header = std::str::from_utf8(&framed[..nul])
        .map_err(|_| StoreError::InvalidObject("non-ascii object header".to_string()))?;
    let (kind_str, size_str) = header
        .split_once(' ')
        .ok_or_else(|| StoreError::InvalidObject(format!("invalid object header: {}", header)))?;
    let kind = ObjectKind::parse(kind_str)?;
    let size: usize = size_str
        .parse()
        .map_err(|_| StoreError::InvalidObject(format!("invalid object size: {}", size_str)))?;
    let data = &framed[nul + 1..];
    if data.len() != size {
        return Err(StoreError::InvalidObject(format!(
            "object size {} does not match payload length {}",
            size,
            data.len()
        )));
    }
    Ok((kind, data))
}
