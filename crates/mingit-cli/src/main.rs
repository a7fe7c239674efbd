//! mingit CLI - minimal git plumbing with smart-HTTP clone.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// mingit - a small content-addressed version control tool
#[derive(Parser, Debug)]
#[command(name = "mingit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a repository in the current directory
    Init,

    /// Print the contents of an object
    CatFile {
        /// Pretty-print the object's raw content
        #[arg(short = 'p')]
        pretty: bool,
        /// Object id (40 hex digits)
        id: String,
    },

    /// Hash a file as a blob, optionally storing it
    HashObject {
        /// Write the object into the store
        #[arg(short = 'w')]
        write: bool,
        /// File to hash
        path: PathBuf,
    },

    /// List the entries of a tree object
    LsTree {
        /// Print only entry names
        #[arg(long)]
        name_only: bool,
        /// Tree id (40 hex digits)
        id: String,
    },

    /// Snapshot the current directory as a tree graph
    WriteTree,

    /// Create a commit object for a tree
    CommitTree {
        /// Tree id to commit
        tree: String,
        /// Parent commit id
        #[arg(short = 'p')]
        parent: Option<String>,
        /// Commit message
        #[arg(short = 'm')]
        message: Option<String>,
    },

    /// Clone a remote repository over smart HTTP
    Clone {
        /// Remote repository URL
        url: String,
        /// Destination directory
        directory: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mingit={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Init => commands::init(),
        Commands::CatFile { pretty, id } => commands::cat_file(pretty, &id),
        Commands::HashObject { write, path } => commands::hash_object(write, &path),
        Commands::LsTree { name_only, id } => commands::ls_tree(name_only, &id),
        Commands::WriteTree => commands::write_tree(),
        Commands::CommitTree {
            tree,
            parent,
            message,
        } => commands::commit_tree(&tree, parent.as_deref(), message.as_deref()),
        Commands::Clone { url, directory } => commands::clone(&url, &directory),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
