//! Repository layout: the `.git` directory and its stores.

use crate::{LooseStore, RefStore, Result, StoreError};
use std::fs;
use std::path::{Path, PathBuf};

/// The default branch a fresh repository points its `HEAD` at.
pub const DEFAULT_BRANCH_REF: &str = "refs/heads/main";

/// A repository: a working directory with a `.git` directory inside it.
#[derive(Debug, Clone)]
pub struct Repository {
    work_dir: PathBuf,
    git_dir: PathBuf,
    /// The loose object store under `.git/objects`.
    pub objects: LooseStore,
    /// The reference store under `.git`.
    pub refs: RefStore,
}

impl Repository {
    /// Initializes a repository at `work_dir`, creating
    /// `.git/{objects,refs}` and pointing `HEAD` at the default branch.
    /// Re-initializing an existing repository is harmless.
    pub fn init(work_dir: impl Into<PathBuf>) -> Result<Self> {
        let work_dir = work_dir.into();
        let git_dir = work_dir.join(".git");
        for dir in ["objects", "refs"] {
            fs::create_dir_all(git_dir.join(dir))?;
        }

        let repo = Self::layout(work_dir, git_dir);
        repo.refs.set_symbolic("HEAD", DEFAULT_BRANCH_REF)?;
        tracing::debug!(path = %repo.work_dir.display(), "initialized repository");
        Ok(repo)
    }

    /// Opens an existing repository at `work_dir`.
    pub fn open(work_dir: impl Into<PathBuf>) -> Result<Self> {
        let work_dir = work_dir.into();
        let git_dir = work_dir.join(".git");
        if !git_dir.is_dir() {
            return Err(StoreError::NotARepository(work_dir.display().to_string()));
        }
        Ok(Self::layout(work_dir, git_dir))
    }

    fn layout(work_dir: PathBuf, git_dir: PathBuf) -> Self {
        let objects = LooseStore::new(git_dir.join("objects"));
        let refs = RefStore::new(&git_dir);
        Self {
            work_dir,
            git_dir,
            objects,
            refs,
        }
    }

    /// Returns the working directory.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Returns the `.git` directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }
}
