//! File-backed reference storage.
//!
//! One flat text file per ref under the git directory: a branch ref holds
//! `<40-hex>\n`, and `HEAD` holds a symref line such as
//! `ref: refs/heads/main\n`. No reflog, no packed-refs.

use crate::{ObjectId, Result, StoreError};
use std::fs;
use std::path::PathBuf;

/// A reference: either directly an object id, or the name of another ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Direct reference to an object.
    Direct(ObjectId),
    /// Symbolic reference, e.g. `HEAD -> refs/heads/main`.
    Symbolic(String),
}

/// Reference store rooted at a git directory.
#[derive(Debug, Clone)]
pub struct RefStore {
    git_dir: PathBuf,
}

impl RefStore {
    /// Creates a ref store rooted at a git directory.
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    fn ref_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || (name != "HEAD" && !name.starts_with("refs/"))
            || name.split('/').any(|c| c.is_empty() || c == "." || c == "..")
        {
            return Err(StoreError::InvalidRef(name.to_string()));
        }
        Ok(self.git_dir.join(name))
    }

    /// Points a ref directly at an object.
    pub fn set(&self, name: &str, id: &ObjectId) -> Result<()> {
        let path = self.ref_path(name)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, format!("{}\n", id))?;
        Ok(())
    }

    /// Writes a symbolic ref, e.g. `HEAD` -> `refs/heads/main`.
    pub fn set_symbolic(&self, name: &str, target: &str) -> Result<()> {
        let path = self.ref_path(name)?;
        self.ref_path(target)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, format!("ref: {}\n", target))?;
        Ok(())
    }

    /// Reads a ref by name.
    pub fn get(&self, name: &str) -> Result<Reference> {
        let path = self.ref_path(name)?;
        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::RefNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let line = contents.trim_end_matches('\n');
        if let Some(target) = line.strip_prefix("ref: ") {
            Ok(Reference::Symbolic(target.to_string()))
        } else {
            Ok(Reference::Direct(ObjectId::from_hex(line).map_err(
                |_| StoreError::InvalidRef(format!("{}: {:?}", name, line)),
            )?))
        }
    }

    /// Resolves `HEAD` to a commit id, following one level of symref.
    pub fn resolve_head(&self) -> Result<ObjectId> {
        match self.get("HEAD")? {
            Reference::Direct(id) => Ok(id),
            Reference::Symbolic(target) => match self.get(&target)? {
                Reference::Direct(id) => Ok(id),
                Reference::Symbolic(_) => Err(StoreError::InvalidRef(
                    "nested symbolic refs not supported".to_string(),
                )),
            },
        }
    }

    /// Returns the current branch name, if `HEAD` is a branch symref.
    #[must_use]
    pub fn current_branch(&self) -> Option<String> {
        match self.get("HEAD").ok()? {
            Reference::Symbolic(target) => {
                target.strip_prefix("refs/heads/").map(|s| s.to_string())
            }
            Reference::Direct(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn refs() -> (TempDir, RefStore) {
        let temp = TempDir::new().unwrap();
        let store = RefStore::new(temp.path());
        (temp, store)
    }

    #[test]
    fn test_set_and_resolve_head() {
        let (_temp, refs) = refs();
        let id = ObjectId::from_hex("a94a8fe5ccb19ba61c4c0873d391e987982fbbd3").unwrap();

        refs.set_symbolic("HEAD", "refs/heads/main").unwrap();
        refs.set("refs/heads/main", &id).unwrap();

        assert_eq!(refs.current_branch(), Some("main".to_string()));
        assert_eq!(refs.resolve_head().unwrap(), id);
    }

    #[test]
    fn test_branch_ref_file_contents() {
        let (_temp, refs) = refs();
        let id = ObjectId::from_bytes([0xcd; 20]);
        refs.set("refs/heads/main", &id).unwrap();

        let raw = fs::read_to_string(refs.git_dir.join("refs/heads/main")).unwrap();
        assert_eq!(raw, format!("{}\n", "cd".repeat(20)));
    }

    #[test]
    fn test_missing_ref() {
        let (_temp, refs) = refs();
        assert!(matches!(
            refs.get("refs/heads/nope"),
            Err(StoreError::RefNotFound(_))
        ));
    }

    #[test]
    fn test_ref_name_validation() {
        let (_temp, refs) = refs();
        let id = ObjectId::from_bytes([1; 20]);
        assert!(refs.set("", &id).is_err());
        assert!(refs.set("heads/main", &id).is_err());
        assert!(refs.set("refs/../escape", &id).is_err());
        assert!(refs.set("refs//double", &id).is_err());
        assert!(refs.set("refs/heads/main", &id).is_ok());
    }

    #[test]
    fn test_garbage_ref_contents() {
        let (_temp, refs) = refs();
        fs::create_dir_all(refs.git_dir.join("refs/heads")).unwrap();
        fs::write(refs.git_dir.join("refs/heads/bad"), "not-a-hash\n").unwrap();
        assert!(matches!(
            refs.get("refs/heads/bad"),
            Err(StoreError::InvalidRef(_))
        ));
    }
}
