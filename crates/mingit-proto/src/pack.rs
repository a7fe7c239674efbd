//! Packfile decoding.
//!
//! A pack is `"PACK" <version> <count>` followed by that many entries and a
//! trailing SHA-1 of everything before it. Entries are zlib streams behind a
//! variable-length header; ref-delta entries name a base object by id and
//! carry a delta stream instead of raw content.

use crate::{delta, ProtoError, Result};
use flate2::read::ZlibDecoder;
use mingit_store::{GitObject, LooseStore, ObjectId, ObjectKind};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::io::Read;

/// Magic bytes at the start of a pack file.
const PACK_SIGNATURE: &[u8; 4] = b"PACK";
/// Pack file version we support.
const PACK_VERSION: u32 = 2;

/// Pack entry type codes.
const TYPE_TAG: u8 = 4;
const TYPE_OFS_DELTA: u8 = 6;
const TYPE_REF_DELTA: u8 = 7;

/// A deferred ref-delta entry awaiting its base.
struct PendingDelta {
    base: ObjectId,
    delta: Vec<u8>,
}

/// Decodes a pack file and writes its objects to a loose store.
pub struct PackReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackReader<'a> {
    /// Creates a reader over a complete pack, trailer included.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decodes the pack. The trailer checksum is verified before any entry
    /// is touched. Returns the ids of all stored objects; tag entries are
    /// decoded but skipped.
    pub fn parse(&mut self, store: &LooseStore) -> Result<Vec<ObjectId>> {
        let count = self.read_header()?;
        tracing::debug!(objects = count, "decoding pack");

        // Objects materialized from this pack, for delta bases that arrive
        // in the same stream (before or after their delta).
        let mut seen: HashMap<ObjectId, GitObject> = HashMap::new();
        let mut pending: Vec<PendingDelta> = Vec::new();
        let mut ids = Vec::with_capacity(count);

        for _ in 0..count {
            let (type_code, size) = self.read_entry_header()?;
            match type_code {
                TYPE_OFS_DELTA => {
                    return Err(ProtoError::UnsupportedPackObject(
                        "ofs-delta".to_string(),
                    ));
                }
                TYPE_REF_DELTA => {
                    let base = self.read_base_id()?;
                    let delta = self.inflate(size)?;
                    pending.push(PendingDelta { base, delta });
                }
                TYPE_TAG => {
                    // Keep the stream position honest, then drop the tag.
                    self.inflate(size)?;
                    tracing::debug!("skipping tag entry");
                }
                _ => {
                    let kind = ObjectKind::from_pack_code(type_code)
                        .map_err(|_| ProtoError::InvalidPack(format!(
                            "unknown entry type {}",
                            type_code
                        )))?;
                    let data = self.inflate(size)?;
                    let object = GitObject::new(kind, data);
                    store.put(&object)?;
                    ids.push(object.id);
                    seen.insert(object.id, object);
                }
            }
        }

        if self.pos != self.data.len() - 20 {
            return Err(ProtoError::InvalidPack(format!(
                "{} trailing bytes after last entry",
                self.data.len() - 20 - self.pos
            )));
        }

        self.resolve_deltas(pending, &mut seen, store, &mut ids)?;
        Ok(ids)
    }

    /// Validates magic, version and trailer; returns the entry count.
    fn read_header(&mut self) -> Result<usize> {
        if self.data.len() < 12 + 20 {
            return Err(ProtoError::InvalidPack("pack too small".to_string()));
        }

        let trailer_start = self.data.len() - 20;
        let digest = Sha1::digest(&self.data[..trailer_start]);
        if digest.as_slice() != &self.data[trailer_start..] {
            return Err(ProtoError::InvalidPack(
                "trailer checksum mismatch".to_string(),
            ));
        }

        if &self.data[0..4] != PACK_SIGNATURE {
            return Err(ProtoError::InvalidPack("bad signature".to_string()));
        }
        let version = u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]]);
        if version != PACK_VERSION {
            return Err(ProtoError::InvalidPack(format!(
                "unsupported version: {}",
                version
            )));
        }
        let count =
            u32::from_be_bytes([self.data[8], self.data[9], self.data[10], self.data[11]]);
        self.pos = 12;
        Ok(count as usize)
    }

    /// Reads one entry header: 3 type bits and a size in the low 4 bits of
    /// the first byte plus 7-bit little-endian continuations.
    fn read_entry_header(&mut self) -> Result<(u8, usize)> {
        let first = self.next_byte()?;
        let type_code = (first >> 4) & 0x07;
        let mut size = (first & 0x0f) as usize;
        let mut shift = 4;

        let mut cont = first & 0x80 != 0;
        while cont {
            let byte = self.next_byte()?;
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
            if shift > 63 {
                return Err(ProtoError::InvalidPack("oversized entry".to_string()));
            }
            cont = byte & 0x80 != 0;
        }
        Ok((type_code, size))
    }

    fn read_base_id(&mut self) -> Result<ObjectId> {
        let end = self.pos + ObjectId::LEN;
        let bytes = self
            .entry_region()
            .get(..ObjectId::LEN)
            .ok_or_else(|| ProtoError::InvalidPack("truncated base id".to_string()))?;
        let id = ObjectId::try_from(bytes)
            .map_err(|e| ProtoError::InvalidPack(e.to_string()))?;
        self.pos = end;
        Ok(id)
    }

    /// Decompresses one zlib stream from the current position and advances
    /// past it. The stream must inflate to exactly `size` bytes.
    ///
    /// The stream is drained to its end so the consumed-byte count covers
    /// the zlib trailer; stopping at `size` output bytes would leave it
    /// unconsumed and misalign the next entry.
    fn inflate(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(self.entry_region());
        let mut out = Vec::with_capacity(size);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| ProtoError::InvalidPack(format!("decompression failed: {}", e)))?;
        if out.len() != size {
            return Err(ProtoError::InvalidPack(format!(
                "entry inflated to {} bytes, expected {}",
                out.len(),
                size
            )));
        }
        self.pos += decoder.total_in() as usize;
        Ok(out)
    }

    /// The bytes from the current position up to the trailer.
    fn entry_region(&self) -> &'a [u8] {
        &self.data[self.pos..self.data.len() - 20]
    }

    fn next_byte(&mut self) -> Result<u8> {
        let byte = *self
            .entry_region()
            .first()
            .ok_or_else(|| ProtoError::InvalidPack("unexpected end of pack".to_string()))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Resolves deferred deltas to fixed point. Bases may come from this
    /// pack (in either order) or from the loose store; a pass that makes no
    /// progress means a base is missing.
    fn resolve_deltas(
        &self,
        mut pending: Vec<PendingDelta>,
        seen: &mut HashMap<ObjectId, GitObject>,
        store: &LooseStore,
        ids: &mut Vec<ObjectId>,
    ) -> Result<()> {
        while !pending.is_empty() {
            let before = pending.len();
            let mut unresolved = Vec::new();

            for entry in pending {
                let base = match seen.get(&entry.base) {
                    Some(object) => Some(object.clone()),
                    None if store.contains(&entry.base) => Some(store.get(&entry.base)?),
                    None => None,
                };
                match base {
                    Some(base) => {
                        let data = delta::apply(&base.data, &entry.delta)?;
                        // The reconstructed object inherits its base's kind.
                        let object = GitObject::new(base.kind, data);
                        store.put(&object)?;
                        ids.push(object.id);
                        seen.insert(object.id, object);
                    }
                    None => unresolved.push(entry),
                }
            }

            if unresolved.len() == before {
                return Err(ProtoError::MissingBase(unresolved[0].base.to_hex()));
            }
            pending = unresolved;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::encode_varint;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, LooseStore) {
        let temp = TempDir::new().unwrap();
        let store = LooseStore::new(temp.path().join("objects"));
        (temp, store)
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn entry_header(type_code: u8, size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut first = (type_code << 4) | (size & 0x0f) as u8;
        let mut rest = size >> 4;
        if rest > 0 {
            first |= 0x80;
        }
        out.push(first);
        while rest > 0 {
            let mut byte = (rest & 0x7f) as u8;
            rest >>= 7;
            if rest > 0 {
                byte |= 0x80;
            }
            out.push(byte);
        }
        out
    }

    enum Entry {
        Raw(u8, Vec<u8>),
        RefDelta(ObjectId, Vec<u8>),
    }

    fn build_pack(entries: &[Entry]) -> Vec<u8> {
        let mut pack = Vec::new();
        pack.extend_from_slice(b"PACK");
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for entry in entries {
            match entry {
                Entry::Raw(code, payload) => {
                    pack.extend_from_slice(&entry_header(*code, payload.len()));
                    pack.extend_from_slice(&deflate(payload));
                }
                Entry::RefDelta(base, payload) => {
                    pack.extend_from_slice(&entry_header(TYPE_REF_DELTA, payload.len()));
                    pack.extend_from_slice(base.as_bytes());
                    pack.extend_from_slice(&deflate(payload));
                }
            }
        }
        let digest = Sha1::digest(&pack);
        pack.extend_from_slice(&digest);
        pack
    }

    fn hello_delta() -> Vec<u8> {
        // base "hello world" -> "hello"
        let mut d = encode_varint(11);
        d.extend_from_slice(&encode_varint(5));
        d.extend_from_slice(&[0x90, 0x05]);
        d
    }

    #[test]
    fn test_plain_objects_are_stored() {
        let (_temp, store) = temp_store();
        let pack = build_pack(&[
            Entry::Raw(3, b"hello\n".to_vec()),
            Entry::Raw(3, b"world\n".to_vec()),
        ]);

        let ids = PackReader::new(&pack).parse(&store).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(
            ids[0].to_hex(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
        let back = store.get(&ids[1]).unwrap();
        assert_eq!(back.kind, ObjectKind::Blob);
        assert_eq!(back.data.as_ref(), b"world\n");
    }

    #[test]
    fn test_large_entry_size_header() {
        let (_temp, store) = temp_store();
        // A payload long enough to need two continuation bytes.
        let payload = vec![b'x'; 5000];
        let pack = build_pack(&[Entry::Raw(3, payload.clone())]);
        let ids = PackReader::new(&pack).parse(&store).unwrap();
        assert_eq!(store.get(&ids[0]).unwrap().data.len(), payload.len());
    }

    #[test]
    fn test_ref_delta_after_base() {
        let (_temp, store) = temp_store();
        let base = GitObject::blob(b"hello world".to_vec());
        let pack = build_pack(&[
            Entry::Raw(3, b"hello world".to_vec()),
            Entry::RefDelta(base.id, hello_delta()),
        ]);

        let ids = PackReader::new(&pack).parse(&store).unwrap();
        assert_eq!(ids.len(), 2);
        // The target is "hello", framed and hashed like any blob.
        let target = GitObject::blob(b"hello".to_vec());
        assert_eq!(ids[1], target.id);
        assert_eq!(store.get(&target.id).unwrap().data.as_ref(), b"hello");
    }

    #[test]
    fn test_ref_delta_before_base_in_same_pack() {
        let (_temp, store) = temp_store();
        let base = GitObject::blob(b"hello world".to_vec());
        let pack = build_pack(&[
            Entry::RefDelta(base.id, hello_delta()),
            Entry::Raw(3, b"hello world".to_vec()),
        ]);

        let ids = PackReader::new(&pack).parse(&store).unwrap();
        let target = GitObject::blob(b"hello".to_vec());
        assert!(ids.contains(&target.id));
        assert_eq!(store.get(&target.id).unwrap().data.as_ref(), b"hello");
    }

    #[test]
    fn test_ref_delta_against_loose_store() {
        let (_temp, store) = temp_store();
        let base = GitObject::blob(b"hello world".to_vec());
        store.put(&base).unwrap();

        let pack = build_pack(&[Entry::RefDelta(base.id, hello_delta())]);
        let ids = PackReader::new(&pack).parse(&store).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.get(&ids[0]).unwrap().data.as_ref(), b"hello");
    }

    #[test]
    fn test_delta_chain_inherits_root_kind() {
        let (_temp, store) = temp_store();
        let base = GitObject::new(ObjectKind::Commit, b"hello world".to_vec());
        // first delta shortens to "hello", second shortens that to "hell".
        let mut second = encode_varint(5);
        second.extend_from_slice(&encode_varint(4));
        second.extend_from_slice(&[0x90, 0x04]);
        let first_target = GitObject::new(ObjectKind::Commit, b"hello".to_vec());

        let pack = build_pack(&[
            Entry::RefDelta(first_target.id, second),
            Entry::RefDelta(base.id, hello_delta()),
            Entry::Raw(1, b"hello world".to_vec()),
        ]);

        let ids = PackReader::new(&pack).parse(&store).unwrap();
        assert_eq!(ids.len(), 3);
        for id in &ids {
            assert_eq!(store.get(id).unwrap().kind, ObjectKind::Commit);
        }
    }

    #[test]
    fn test_missing_base_is_fatal() {
        let (_temp, store) = temp_store();
        let ghost = ObjectId::from_bytes([0x42; 20]);
        let pack = build_pack(&[Entry::RefDelta(ghost, hello_delta())]);
        assert!(matches!(
            PackReader::new(&pack).parse(&store),
            Err(ProtoError::MissingBase(_))
        ));
    }

    #[test]
    fn test_ofs_delta_is_unsupported() {
        let (_temp, store) = temp_store();
        let pack = build_pack(&[Entry::Raw(TYPE_OFS_DELTA, b"whatever".to_vec())]);
        assert!(matches!(
            PackReader::new(&pack).parse(&store),
            Err(ProtoError::UnsupportedPackObject(_))
        ));
    }

    #[test]
    fn test_tag_entries_are_skipped() {
        let (_temp, store) = temp_store();
        let pack = build_pack(&[
            Entry::Raw(TYPE_TAG, b"object 1234\n".to_vec()),
            Entry::Raw(3, b"kept\n".to_vec()),
        ]);
        let ids = PackReader::new(&pack).parse(&store).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.get(&ids[0]).unwrap().data.as_ref(), b"kept\n");
    }

    #[test]
    fn test_trailer_mismatch_rejected_before_decoding() {
        let (_temp, store) = temp_store();
        let mut pack = build_pack(&[Entry::Raw(3, b"hello\n".to_vec())]);
        let last = pack.len() - 1;
        pack[last] ^= 0xff;
        assert!(matches!(
            PackReader::new(&pack).parse(&store),
            Err(ProtoError::InvalidPack(_))
        ));
        // Nothing was written.
        let blob = GitObject::blob(b"hello\n".to_vec());
        assert!(!store.contains(&blob.id));
    }

    #[test]
    fn test_bad_signature_and_version() {
        let (_temp, store) = temp_store();

        let mut pack = build_pack(&[]);
        pack[0] = b'K';
        let digest = Sha1::digest(&pack[..pack.len() - 20]);
        let trailer_start = pack.len() - 20;
        pack[trailer_start..].copy_from_slice(&digest);
        assert!(PackReader::new(&pack).parse(&store).is_err());

        let mut pack = build_pack(&[]);
        pack[7] = 3;
        let digest = Sha1::digest(&pack[..pack.len() - 20]);
        let trailer_start = pack.len() - 20;
        pack[trailer_start..].copy_from_slice(&digest);
        assert!(PackReader::new(&pack).parse(&store).is_err());
    }

    #[test]
    fn test_truncated_pack() {
        let (_temp, store) = temp_store();
        assert!(PackReader::new(b"PACK").parse(&store).is_err());
    }
}
