//! CLI command implementations.

use mingit_proto::{PackReader, RemoteClient};
use mingit_store::{
    Commit, GitObject, ObjectId, ObjectKind, Repository, Signature, Tree, DEFAULT_BRANCH_REF,
};
use mingit_worktree::{checkout_commit, write_tree as snapshot_tree};
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("object {0} is not a {1}")]
    WrongKind(String, &'static str),

    #[error(transparent)]
    Store(#[from] mingit_store::StoreError),

    #[error(transparent)]
    Proto(#[from] mingit_proto::ProtoError),

    #[error(transparent)]
    Worktree(#[from] mingit_worktree::WorktreeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

fn open_repo() -> Result<Repository> {
    Ok(Repository::open(std::env::current_dir()?)?)
}

fn parse_id(hex: &str) -> Result<ObjectId> {
    ObjectId::from_hex(hex)
        .map_err(|_| CliError::Usage(format!("not a valid object id: {hex}")))
}

/// Initialize a repository in the current directory.
pub fn init() -> Result<()> {
    Repository::init(std::env::current_dir()?)?;
    println!("Initialized git directory");
    Ok(())
}

/// Print an object's raw bytes to stdout.
pub fn cat_file(pretty: bool, id: &str) -> Result<()> {
    if !pretty {
        return Err(CliError::Usage("cat-file requires -p".to_string()));
    }
    let repo = open_repo()?;
    let object = repo.objects.get(&parse_id(id)?)?;

    // Raw bytes, nothing appended.
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&object.data)?;
    stdout.flush()?;
    Ok(())
}

/// Hash a file as a blob; with `write`, also store it.
pub fn hash_object(write: bool, path: &Path) -> Result<()> {
    let blob = GitObject::blob(fs::read(path)?);
    if write {
        let repo = open_repo()?;
        repo.objects.put(&blob)?;
    }
    println!("{}", blob.id);
    Ok(())
}

/// List a tree's entries.
pub fn ls_tree(name_only: bool, id: &str) -> Result<()> {
    let repo = open_repo()?;
    let id = parse_id(id)?;
    let object = repo.objects.get(&id)?;
    if object.kind != ObjectKind::Tree {
        return Err(CliError::WrongKind(id.to_hex(), "tree"));
    }
    let tree = Tree::parse(&object.data)?;
    print!("{}", tree.format(name_only));
    Ok(())
}

/// Snapshot the current directory and print the root tree id.
pub fn write_tree() -> Result<()> {
    let repo = open_repo()?;
    let root = snapshot_tree(&repo.objects, repo.work_dir())?;
    println!("{root}");
    Ok(())
}

/// Reads a signature role from the environment.
///
/// The author pair is required; the committer falls back to the author
/// rather than inventing an identity.
fn identity_from_env() -> Result<(Signature, Signature)> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    let author_name = var("AUTHOR_NAME");
    let author_email = var("AUTHOR_EMAIL");
    let (author_name, author_email) = match (author_name, author_email) {
        (Some(name), Some(email)) => (name, email),
        _ => {
            return Err(CliError::Usage(
                "author identity not configured; set AUTHOR_NAME and AUTHOR_EMAIL".to_string(),
            ));
        }
    };
    let committer_name = var("COMMITTER_NAME").unwrap_or_else(|| author_name.clone());
    let committer_email = var("COMMITTER_EMAIL").unwrap_or_else(|| author_email.clone());

    let author = Signature::now_utc(author_name, author_email)?;
    let committer = Signature::now_utc(committer_name, committer_email)?;
    Ok((author, committer))
}

/// Create a commit object for `tree` and print its id.
pub fn commit_tree(tree: &str, parent: Option<&str>, message: Option<&str>) -> Result<()> {
    let repo = open_repo()?;
    let tree = parse_id(tree)?;
    let parents = match parent {
        Some(hex) => vec![parse_id(hex)?],
        None => Vec::new(),
    };
    let (author, committer) = identity_from_env()?;

    let commit = Commit {
        tree,
        parents,
        author,
        committer,
        // The message always gains a trailing newline, even when absent,
        // so a message-less commit body ends with a blank line.
        message: format!("{}\n", message.unwrap_or_default()),
    };
    let object = GitObject::new(ObjectKind::Commit, commit.encode());
    repo.objects.put(&object)?;
    println!("{}", object.id);
    Ok(())
}

/// Clone a remote repository into `directory`.
pub fn clone(url: &str, directory: &Path) -> Result<()> {
    tracing::info!(url = %url, dir = %directory.display(), "cloning repository");

    // The destination must not already exist. Failures below leave
    // partial state behind; the repository is non-atomic.
    fs::create_dir(directory)?;
    let repo = Repository::init(directory)?;

    let client = RemoteClient::new(url)?;
    let head = client.discover_head()?;
    tracing::info!(head = %head, "discovered remote head");

    let pack = client.fetch_pack(&head)?;
    let ids = PackReader::new(&pack).parse(&repo.objects)?;
    tracing::info!(objects = ids.len(), "imported pack");

    repo.refs.set(DEFAULT_BRANCH_REF, &head)?;
    checkout_commit(&repo.objects, &head, repo.work_dir())?;
    Ok(())
}
