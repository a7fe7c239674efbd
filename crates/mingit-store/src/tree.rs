//! Tree objects: ordered directory listings.
//!
//! A tree's raw form is a sequence of `<mode> SP <name> NUL <20-byte id>`
//! entries. Entries are sorted byte-lexically on the name, with directory
//! names compared as if a `/` were appended, so `dir` sorts as `dir/`.
//! Identifiers depend on this exact ordering.

use crate::{ObjectId, ObjectKind, Result, StoreError};

/// The file modes a tree entry may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// A subtree, mode `40000`.
    Directory,
    /// A regular file, mode `100644`.
    Regular,
    /// An executable file, mode `100755`.
    Executable,
    /// A symbolic link, mode `120000`.
    Symlink,
}

impl EntryMode {
    /// Returns the mode string as stored in tree objects.
    #[must_use]
    pub fn as_mode_str(&self) -> &'static str {
        match self {
            Self::Directory => "40000",
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
        }
    }

    /// Returns the mode string as rendered by `ls-tree`, with the
    /// directory mode zero-padded to `040000`.
    #[must_use]
    pub fn display_str(&self) -> &'static str {
        match self {
            Self::Directory => "040000",
            other => other.as_mode_str(),
        }
    }

    /// Parses a stored mode string.
    pub fn from_mode_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StoreError::InvalidObject(format!(
                "non-numeric tree entry mode: {:?}",
                s
            )));
        }
        match s {
            "40000" => Ok(Self::Directory),
            "100644" => Ok(Self::Regular),
            "100755" => Ok(Self::Executable),
            "120000" => Ok(Self::Symlink),
            _ => Err(StoreError::InvalidObject(format!(
                "unknown tree entry mode: {}",
                s
            ))),
        }
    }

    /// Returns the kind of object this entry points at.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Directory => ObjectKind::Tree,
            _ => ObjectKind::Blob,
        }
    }

    /// Returns true for the subtree mode.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// One entry of a tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// The entry's file mode.
    pub mode: EntryMode,
    /// The path component. Never empty, never `.git`, contains no `/` or NUL.
    pub name: String,
    /// The identifier of the blob or subtree.
    pub id: ObjectId,
}

impl TreeEntry {
    /// Creates an entry, validating the name.
    pub fn new(mode: EntryMode, name: impl Into<String>, id: ObjectId) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.contains('/') || name.contains('\0') {
            return Err(StoreError::InvalidObject(format!(
                "invalid tree entry name: {:?}",
                name
            )));
        }
        if name == ".git" {
            return Err(StoreError::InvalidObject(
                "tree entry must not be named .git".to_string(),
            ));
        }
        Ok(Self { mode, name, id })
    }

    /// The byte sequence this entry sorts by: the name, with a trailing `/`
    /// for subtrees.
    #[must_use]
    pub fn sort_key(&self) -> Vec<u8> {
        let mut key = self.name.clone().into_bytes();
        if self.mode.is_dir() {
            key.push(b'/');
        }
        key
    }

    /// Renders the entry as one `ls-tree` line (without the newline).
    #[must_use]
    pub fn format_line(&self) -> String {
        format!(
            "{} {} {}\t{}",
            self.mode.display_str(),
            self.mode.kind(),
            self.id,
            self.name
        )
    }
}

/// A tree object: an ordered sequence of entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Builds a tree from entries, sorting them into canonical order.
    #[must_use]
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { entries }
    }

    /// Returns the entries in stored order.
    #[must_use]
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Parses a tree from its raw bytes.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut rest = raw;
        while !rest.is_empty() {
            let sp = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| truncated("mode"))?;
            let mode_str = std::str::from_utf8(&rest[..sp])
                .map_err(|_| StoreError::InvalidObject("non-ascii tree entry mode".to_string()))?;
            let mode = EntryMode::from_mode_str(mode_str)?;
            rest = &rest[sp + 1..];

            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| truncated("name"))?;
            let name = std::str::from_utf8(&rest[..nul])
                .map_err(|_| StoreError::InvalidObject("non-utf8 tree entry name".to_string()))?
                .to_string();
            rest = &rest[nul + 1..];

            if rest.len() < ObjectId::LEN {
                return Err(truncated("object id"));
            }
            let id = ObjectId::try_from(&rest[..ObjectId::LEN])?;
            rest = &rest[ObjectId::LEN..];

            entries.push(TreeEntry::new(mode, name, id)?);
        }
        Ok(Self { entries })
    }

    /// Encodes the tree to its raw bytes in stored order.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.as_mode_str().as_bytes());
            out.push(b' ');
            out.extend_from_slice(entry.name.as_bytes());
            out.push(0);
            out.extend_from_slice(entry.id.as_bytes());
        }
        out
    }

    /// Renders the tree the way `ls-tree` prints it, one entry per line.
    /// With `name_only`, only the names are printed.
    #[must_use]
    pub fn format(&self, name_only: bool) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if name_only {
                out.push_str(&entry.name);
            } else {
                out.push_str(&entry.format_line());
            }
            out.push('\n');
        }
        out
    }
}

fn truncated(what: &str) -> StoreError {
    StoreError::InvalidObject(format!("truncated tree entry: missing {}", what))
}
