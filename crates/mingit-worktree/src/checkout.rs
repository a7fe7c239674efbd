//! Checkout: materializing a commit's tree as files on disk.

use crate::Result;
use mingit_store::{Commit, EntryMode, LooseStore, ObjectId, Tree};
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::Path;

/// Materializes the tree of `commit_id` into `target`.
///
/// Directories are created tolerantly; existing files are not cleared
/// first, so callers are expected to check out into a fresh directory.
pub fn checkout_commit(store: &LooseStore, commit_id: &ObjectId, target: &Path) -> Result<()> {
    let object = store.get(commit_id)?;
    let commit = Commit::parse(&object.data)?;
    tracing::debug!(commit = %commit_id, tree = %commit.tree, "checking out");

    fs::create_dir_all(target)?;
    checkout_tree(store, &commit.tree, target)
}

fn checkout_tree(store: &LooseStore, tree_id: &ObjectId, dir: &Path) -> Result<()> {
    let object = store.get(tree_id)?;
    let tree = Tree::parse(&object.data)?;

    for entry in tree.entries() {
        let path = dir.join(&entry.name);
        match entry.mode {
            EntryMode::Directory => {
                match fs::create_dir(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                    Err(e) => return Err(e.into()),
                }
                checkout_tree(store, &entry.id, &path)?;
            }
            EntryMode::Regular | EntryMode::Executable => {
                let blob = store.get(&entry.id)?;
                fs::write(&path, &blob.data)?;
                if entry.mode == EntryMode::Executable {
                    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
                }
            }
            EntryMode::Symlink => {
                let blob = store.get(&entry.id)?;
                let target = String::from_utf8_lossy(&blob.data).to_string();
                symlink(&target, &path)?;
            }
        }
    }
    Ok(())
}
