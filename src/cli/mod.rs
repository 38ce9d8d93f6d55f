//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{SkipRules, SyncSettings};
use crate::error::Result;
use crate::sync::SyncDirection;

pub mod commands;

/// journal-sync - keep a Markdown tree and a journal database in step
#[derive(Parser, Debug)]
#[command(name = "jsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.journal-sync/data/journal-sync.db)
    #[arg(long, global = true, env = "JSYNC_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "JSYNC_ACTOR")]
    pub actor: Option<String>,

    #[command(flatten)]
    pub tree: TreeArgs,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Where the Markdown tree lives and what to leave out of the sync.
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Markdown source path: "[store:bucket] path" or a bare path
    #[arg(long, global = true, env = "JSYNC_SOURCE", default_value = "journal")]
    pub source: String,

    /// World name; names the synced directory when no import path is set
    #[arg(long, global = true, env = "JSYNC_WORLD", default_value = "world")]
    pub world: String,

    /// Path under the source holding the synced tree (default: <world>/)
    #[arg(long, global = true, env = "JSYNC_IMPORT_PATH", default_value = "")]
    pub import_path: String,

    /// Comma-separated folder names to leave out
    #[arg(long, global = true, default_value = "")]
    pub skip_folders: String,

    /// Comma-separated document names to leave out
    #[arg(long, global = true, default_value = "")]
    pub skip_entries: String,

    /// Base directory of the Markdown store
    #[arg(long, global = true, env = "JSYNC_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,
}

impl TreeArgs {
    /// Validate into sync settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the world name is empty or the path leaves the data directory.
    pub fn settings(&self) -> Result<SyncSettings> {
        SyncSettings::new(
            &self.source,
            &self.world,
            &self.import_path,
            SkipRules::from_lists(&self.skip_folders, &self.skip_entries),
            self.data_dir.clone(),
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and the directories above the synced tree
    Init {
        /// Re-run on an existing database (contents are kept)
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Show the merged tree with per-document status
    Tree,

    /// List the actions a sync would take
    Plan,

    /// Run one sync pass
    Sync {
        /// Which side to write to
        #[arg(long, value_enum, default_value_t)]
        direction: SyncDirection,

        /// Show the plan without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Folder management
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },

    /// Journal record management
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Folder Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Create a folder
    Create {
        /// Folder name
        name: String,

        /// Parent folder ID
        #[arg(long)]
        parent: Option<String>,

        /// Create the folder hidden (not synced)
        #[arg(long)]
        hidden: bool,
    },

    /// List folders
    List,

    /// Hide a folder from the sync
    Hide {
        /// Folder ID
        id: String,
    },

    /// Include a hidden folder in the sync again
    Show {
        /// Folder ID
        id: String,
    },
}

// ============================================================================
// Record Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Create a journal record
    Create {
        /// Record name
        name: String,

        /// Record content
        #[arg(long, short, default_value = "")]
        content: String,

        /// Containing folder ID (default: top level)
        #[arg(long)]
        folder: Option<String>,
    },

    /// Edit a record; marks it for export
    Edit {
        /// Record ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New content
        #[arg(long, short)]
        content: Option<String>,

        /// Move into this folder
        #[arg(long, conflicts_with = "top_level")]
        folder: Option<String>,

        /// Move to the top level
        #[arg(long)]
        top_level: bool,
    },

    /// List records
    List {
        /// Only records in this folder
        #[arg(long)]
        folder: Option<String>,
    },

    /// Show a record by ID or name
    Show {
        /// Record ID or exact name
        id: String,
    },
}
