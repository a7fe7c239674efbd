//! Commit objects.
//!
//! A commit's raw form is newline-separated headers, a blank line, then the
//! message:
//!
//! ```text
//! tree <40-hex>
//! parent <40-hex>          (zero or more, in parent order)
//! author <name> <<email>> <unix-ts> <tz-offset>
//! committer <name> <<email>> <unix-ts> <tz-offset>
//!
//! <message>
//! ```

use crate::{ObjectId, Result, StoreError};
use chrono::Utc;

/// An author or committer line: identity plus a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address, serialized inside angle brackets.
    pub email: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Timezone offset, a sign and four digits, e.g. `+0000` or `-0730`.
    pub tz: String,
}

impl Signature {
    /// Creates a signature, validating the parts.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        timestamp: i64,
        tz: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let email = email.into();
        let tz = tz.into();
        if name.contains('\n') || name.contains('<') || name.contains('>') {
            return Err(malformed("name contains reserved characters"));
        }
        if email.contains('\n') || email.contains('<') || email.contains('>') {
            return Err(malformed("email contains reserved characters"));
        }
        if tz.len() != 5
            || !(tz.starts_with('+') || tz.starts_with('-'))
            || !tz[1..].bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed(&format!("invalid timezone offset {:?}", tz)));
        }
        Ok(Self {
            name,
            email,
            timestamp,
            tz,
        })
    }

    /// Creates a signature stamped with the current time in UTC.
    pub fn now_utc(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        Self::new(name, email, Utc::now().timestamp(), "+0000")
    }

    fn encode(&self) -> String {
        format!("{} <{}> {} {}", self.name, self.email, self.timestamp, self.tz)
    }

    fn parse(line: &str) -> Result<Self> {
        let open = line.find(" <").ok_or_else(|| malformed(line))?;
        let name = &line[..open];
        let rest = &line[open + 2..];
        let close = rest.find('>').ok_or_else(|| malformed(line))?;
        let email = &rest[..close];
        let mut fields = rest[close + 1..].split_whitespace();
        let timestamp = fields
            .next()
            .and_then(|f| f.parse::<i64>().ok())
            .ok_or_else(|| malformed(line))?;
        let tz = fields.next().ok_or_else(|| malformed(line))?;
        if fields.next().is_some() {
            return Err(malformed(line));
        }
        Self::new(name, email, timestamp, tz)
    }
}

fn malformed(detail: &str) -> StoreError {
    StoreError::InvalidObject(format!("malformed signature: {}", detail))
}

/// A commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// The root tree this commit snapshots.
    pub tree: ObjectId,
    /// Parent commits, in parent order.
    pub parents: Vec<ObjectId>,
    /// Who wrote the change.
    pub author: Signature,
    /// Who created the commit.
    pub committer: Signature,
    /// The commit message, stored verbatim after the blank line.
    pub message: String,
}

impl Commit {
    /// Parses a commit from its raw bytes.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| StoreError::InvalidObject("commit is not utf-8".to_string()))?;
        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| StoreError::InvalidObject("commit missing blank line".to_string()))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in headers.lines() {
            if let Some(hex) = line.strip_prefix("tree ") {
                if tree.is_some() {
                    return Err(StoreError::InvalidObject(
                        "commit has multiple tree headers".to_string(),
                    ));
                }
                tree = Some(ObjectId::from_hex(hex)?);
            } else if let Some(hex) = line.strip_prefix("parent ") {
                parents.push(ObjectId::from_hex(hex)?);
            } else if let Some(sig) = line.strip_prefix("author ") {
                author = Some(Signature::parse(sig)?);
            } else if let Some(sig) = line.strip_prefix("committer ") {
                committer = Some(Signature::parse(sig)?);
            }
            // Unknown headers (gpgsig, encoding, ...) are carried by real
            // repositories; tolerate them on input.
        }

        let tree = tree
            .ok_or_else(|| StoreError::InvalidObject("commit missing tree header".to_string()))?;
        let author = author
            .ok_or_else(|| StoreError::InvalidObject("commit missing author line".to_string()))?;
        let committer = committer.ok_or_else(|| {
            StoreError::InvalidObject("commit missing committer line".to_string())
        })?;

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message: message.to_string(),
        })
    }

    /// Encodes the commit to its raw bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("tree {}\n", self.tree));
        for parent in &self.parents {
            out.push_str(&format!("parent {}\n", parent));
        }
        out.push_str(&format!("author {}\n", self.author.encode()));
        out.push_str(&format!("committer {}\n", self.committer.encode()));
        out.push('\n');
        out.push_str(&self.message);
        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sig(ts: i64, tz: &str) -> Signature {
        Signature::new("Ada Lovelace", "ada@example.com", ts, tz).unwrap()
    }

    #[test]
    fn test_commit_exact_payload() {
        let commit = Commit {
            tree: ObjectId::from_bytes([0x1a; 20]),
            parents: vec![ObjectId::from_bytes([0x2b; 20])],
            author: sig(1_700_000_000, "-0000"),
            committer: sig(1_700_000_000, "-0000"),
            message: "m\n".to_string(),
        };
        let expected = format!(
            "tree {}\nparent {}\n\
             author Ada Lovelace <ada@example.com> 1700000000 -0000\n\
             committer Ada Lovelace <ada@example.com> 1700000000 -0000\n\nm\n",
            "1a".repeat(20),
            "2b".repeat(20),
        );
        assert_eq!(String::from_utf8(commit.encode()).unwrap(), expected);
    }

    #[test]
    fn test_commit_roundtrip() {
        let commit = Commit {
            tree: ObjectId::from_bytes([3; 20]),
            parents: vec![ObjectId::from_bytes([4; 20]), ObjectId::from_bytes([5; 20])],
            author: sig(1_234_567_890, "+0200"),
            committer: sig(1_234_567_999, "-0730"),
            message: "subject\n\nbody line\n".to_string(),
        };
        let parsed = Commit::parse(&commit.encode()).unwrap();
        assert_eq!(parsed, commit);
    }

    #[test]
    fn test_commit_without_parents() {
        let commit = Commit {
            tree: ObjectId::from_bytes([3; 20]),
            parents: vec![],
            author: sig(0, "+0000"),
            committer: sig(0, "+0000"),
            message: "\n".to_string(),
        };
        let encoded = commit.encode();
        assert!(!String::from_utf8_lossy(&encoded).contains("parent"));
        assert_eq!(Commit::parse(&encoded).unwrap(), commit);
    }

    #[test]
    fn test_parse_missing_tree() {
        let raw = b"author A <a@b> 0 +0000\ncommitter A <a@b> 0 +0000\n\nhi\n";
        let err = Commit::parse(raw).unwrap_err();
        assert!(err.to_string().contains("missing tree"));
    }

    #[test]
    fn test_parse_malformed_author() {
        let raw = format!(
            "tree {}\nauthor broken line\ncommitter A <a@b> 0 +0000\n\nhi\n",
            "00".repeat(20)
        );
        let err = Commit::parse(raw.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("malformed signature"));
    }

    #[test]
    fn test_parse_missing_blank_line() {
        let raw = format!("tree {}\n", "00".repeat(20));
        assert!(Commit::parse(raw.as_bytes()).is_err());
    }

    #[test]
    fn test_signature_rejects_bad_tz() {
        assert!(Signature::new("A", "a@b", 0, "0000").is_err());
        assert!(Signature::new("A", "a@b", 0, "+00:00").is_err());
        assert!(Signature::new("A", "a@b", 0, "+00a0").is_err());
        assert!(Signature::new("A", "a@b", 0, "-0730").is_ok());
    }

    #[test]
    fn test_signature_rejects_reserved_chars() {
        assert!(Signature::new("A <evil>", "a@b", 0, "+0000").is_err());
        assert!(Signature::new("A", "a<@>b", 0, "+0000").is_err());
    }
}
