//! Directory snapshots: the `write-tree` projection.
//!
//! Walks a directory bottom-up, writing a blob per file and a tree per
//! directory, and returns the root tree id. For a fixed filesystem state
//! the root id is deterministic; everything rests on the per-tree entry
//! ordering.

use crate::{Result, WorktreeError};
use mingit_store::{EntryMode, GitObject, LooseStore, ObjectId, Tree, TreeEntry};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Snapshots `dir` into the store and returns the root tree id.
///
/// Entries named `.git` are skipped at every level; a tree must never
/// contain such a child. Entry kinds other than regular files, symlinks
/// and directories fail with [`WorktreeError::UnsupportedEntry`].
pub fn write_tree(store: &LooseStore, dir: &Path) -> Result<ObjectId> {
    let mut entries = Vec::new();

    for dirent in fs::read_dir(dir)? {
        let dirent = dirent?;
        let path = dirent.path();
        if dirent.file_name() == ".git" {
            continue;
        }
        let name = dirent
            .file_name()
            .into_string()
            .map_err(|_| WorktreeError::UnsupportedEntry(path.display().to_string()))?;

        // Symlinks must not be followed, so stat the link itself.
        let metadata = fs::symlink_metadata(&path)?;
        let file_type = metadata.file_type();

        let entry = if file_type.is_dir() {
            let child = write_tree(store, &path)?;
            TreeEntry::new(EntryMode::Directory, name, child)
        } else if file_type.is_symlink() {
            let target = fs::read_link(&path)?;
            let blob = GitObject::blob(target.as_os_str().as_bytes().to_vec());
            store.put(&blob)?;
            TreeEntry::new(EntryMode::Symlink, name, blob.id)
        } else if file_type.is_file() {
            let mode = if metadata.permissions().mode() & 0o111 != 0 {
                EntryMode::Executable
            } else {
                EntryMode::Regular
            };
            let blob = GitObject::blob(fs::read(&path)?);
            store.put(&blob)?;
            TreeEntry::new(mode, name, blob.id)
        } else {
            return Err(WorktreeError::UnsupportedEntry(path.display().to_string()));
        }?;
        entries.push(entry);
    }

    let tree = Tree::from_entries(entries);
    let object = GitObject::new(mingit_store::ObjectKind::Tree, tree.encode());
    store.put(&object)?;
    tracing::trace!(dir = %dir.display(), id = %object.id, "wrote tree");
    Ok(object.id)
}
