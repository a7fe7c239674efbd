//! pkt-line framing.
//!
//! Every line of the smart HTTP dialogue is prefixed with a 4-character hex
//! length that counts itself, or is the flush packet `0000` terminating a
//! section.

use crate::{ProtoError, Result};
use std::io::{Read, Write};

/// The largest payload one frame can carry: the length field caps at
/// `0xffff` and counts its own four digits.
const MAX_PAYLOAD: usize = 0xffff - 4;

/// A single pkt-line frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Vec<u8>),
    /// Flush packet (`0000`).
    Flush,
}

impl PktLine {
    /// Returns the payload, or `None` for a flush.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(payload) => Some(payload),
            Self::Flush => None,
        }
    }

    /// Returns the payload as text with any trailing newline removed.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        let payload = std::str::from_utf8(self.data()?).ok()?;
        Some(payload.trim_end_matches('\n'))
    }
}

/// Decodes the four hex digits of a length prefix.
fn decode_len(prefix: &[u8; 4]) -> Result<usize> {
    prefix
        .iter()
        .try_fold(0usize, |acc, &digit| {
            char::from(digit)
                .to_digit(16)
                .map(|d| (acc << 4) | d as usize)
        })
        .ok_or_else(|| {
            ProtoError::InvalidPktLine(format!(
                "non-hex length prefix {:?}",
                String::from_utf8_lossy(prefix)
            ))
        })
}

/// Reader for pkt-line framed streams.
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    /// Creates a new pkt-line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next frame. Returns `None` at a clean end of stream; a
    /// stream that ends inside a frame is an invalid-frame error.
    pub fn read(&mut self) -> Result<Option<PktLine>> {
        let prefix = match self.fill_prefix()? {
            Some(prefix) => prefix,
            None => return Ok(None),
        };

        match decode_len(&prefix)? {
            0 => Ok(Some(PktLine::Flush)),
            len @ 1..=3 => Err(ProtoError::InvalidPktLine(format!(
                "reserved length {:04x}",
                len
            ))),
            len => {
                let want = len - 4;
                let mut payload = Vec::with_capacity(want);
                let got = self
                    .reader
                    .by_ref()
                    .take(want as u64)
                    .read_to_end(&mut payload)?;
                if got < want {
                    return Err(ProtoError::InvalidPktLine(format!(
                        "frame body ended after {} of {} bytes",
                        got, want
                    )));
                }
                Ok(Some(PktLine::Data(payload)))
            }
        }
    }

    /// Reads a length prefix, distinguishing end-of-stream before a frame
    /// (`None`) from a stream cut off mid-prefix (an error).
    fn fill_prefix(&mut self) -> Result<Option<[u8; 4]>> {
        let mut prefix = [0u8; 4];
        let mut filled = 0;
        while filled < prefix.len() {
            let n = self.reader.read(&mut prefix[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(ProtoError::InvalidPktLine(
                    "truncated length prefix".to_string(),
                ));
            }
            filled += n;
        }
        Ok(Some(prefix))
    }

    /// Returns a mutable reference to the inner reader.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the reader and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writer for pkt-line framed streams.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    /// Creates a new pkt-line writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one data frame around `payload`, prefix and body straight to
    /// the underlying writer.
    pub fn write_data(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtoError::InvalidPktLine(format!(
                "payload of {} bytes exceeds the frame limit",
                payload.len()
            )));
        }
        write!(self.writer, "{:04x}", payload.len() + 4)?;
        self.writer.write_all(payload)?;
        Ok(())
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.writer.write_all(b"0000")?;
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consumes the writer and returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn written(frames: &[&[u8]], trailing_flush: bool) -> Vec<u8> {
        let mut writer = PktLineWriter::new(Vec::new());
        for frame in frames {
            writer.write_data(frame).unwrap();
        }
        if trailing_flush {
            writer.flush_pkt().unwrap();
        }
        writer.into_inner()
    }

    #[test]
    fn test_writer_emits_length_prefixed_frames() {
        assert_eq!(written(&[b"hello\n"], false), b"000ahello\n");
        assert_eq!(written(&[], true), b"0000");

        let want_line = format!("want {} no-progress\n", "0".repeat(40));
        let encoded = written(&[want_line.as_bytes()], false);
        assert_eq!(&encoded[..4], b"003e");
    }

    #[test]
    fn test_writer_rejects_oversized_payload() {
        let mut writer = PktLineWriter::new(Vec::new());
        assert!(writer.write_data(&vec![0u8; MAX_PAYLOAD + 1]).is_err());
        assert!(writer.write_data(&vec![0u8; MAX_PAYLOAD]).is_ok());
    }

    #[test]
    fn test_roundtrip() {
        let stream = written(&[b"hello\n", b"raw\0bytes"], true);

        let mut reader = PktLineReader::new(Cursor::new(stream));
        assert_eq!(
            reader.read().unwrap(),
            Some(PktLine::Data(b"hello\n".to_vec()))
        );
        assert_eq!(
            reader.read().unwrap(),
            Some(PktLine::Data(b"raw\0bytes".to_vec()))
        );
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn test_non_hex_length_is_invalid() {
        let mut reader = PktLineReader::new(Cursor::new(b"00zzoops".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(ProtoError::InvalidPktLine(_))
        ));
    }

    #[test]
    fn test_reserved_lengths_are_invalid() {
        for prefix in [b"0001", b"0002", b"0003"] {
            let mut reader = PktLineReader::new(Cursor::new(prefix.to_vec()));
            assert!(matches!(
                reader.read(),
                Err(ProtoError::InvalidPktLine(_))
            ));
        }
    }

    #[test]
    fn test_truncated_body_is_invalid() {
        let mut reader = PktLineReader::new(Cursor::new(b"000ahel".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(ProtoError::InvalidPktLine(_))
        ));
    }

    #[test]
    fn test_truncated_prefix_is_invalid() {
        let mut reader = PktLineReader::new(Cursor::new(b"00".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(ProtoError::InvalidPktLine(_))
        ));
    }

    #[test]
    fn test_eof_before_prefix_is_clean_end() {
        let mut reader = PktLineReader::new(Cursor::new(Vec::new()));
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn test_as_text_trims_newline() {
        assert_eq!(PktLine::Data(b"NAK\n".to_vec()).as_text(), Some("NAK"));
        assert_eq!(PktLine::Flush.as_text(), None);
    }
}
