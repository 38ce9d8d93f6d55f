//! Initialize journal-sync.
//!
//! Creates the database (schema is applied on open) and the directories
//! above the synced tree in the Markdown store. The synced directory itself
//! is left to the first `jsync sync`, which plans it as `mkdir`.

use crate::cli::TreeArgs;
use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::model::JOURNAL_KIND;
use crate::storage::SqliteStorage;
use crate::store::LocalFileStore;
use crate::sync::prepare_root;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    data_dir: PathBuf,
    sync_root: String,
    directories_created: usize,
    folders: usize,
    records: usize,
}

/// Execute the init command.
///
/// With `force`, an existing database is kept and only re-checked.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not set,
/// or an error if the database or directories cannot be created.
pub fn execute(db_path: Option<&PathBuf>, tree: &TreeArgs, force: bool, json: bool) -> Result<()> {
    let settings = tree.settings()?;
    let db_path = resolve_db_path(db_path.map(|p| p.as_path()))
        .ok_or_else(|| Error::Config("Could not determine the journal-sync directory".to_string()))?;

    if db_path.exists() && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let storage = SqliteStorage::open(&db_path)?;
    let (folders, records) = storage.counts(JOURNAL_KIND)?;
    drop(storage);

    fs::create_dir_all(&settings.data_dir)?;
    let files = LocalFileStore::new(settings.data_dir.clone());
    let rt = super::runtime()?;
    let created = rt.block_on(prepare_root(&files, &settings.sync_base()));

    if json {
        let output = InitOutput {
            database: db_path,
            data_dir: settings.data_dir.clone(),
            sync_root: settings.sync_root(),
            directories_created: created,
            folders,
            records,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized journal-sync");
        println!("  Database:  {} ({folders} folders, {records} records)", db_path.display());
        println!("  Sync root: {}", settings.data_dir.join(settings.sync_root()).display());
        println!();
        println!("Next: run 'jsync plan' to preview the first sync.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn tree_args(data_dir: &std::path::Path) -> TreeArgs {
        let cli = crate::cli::Cli::parse_from([
            "jsync",
            "init",
            "--source",
            "worlds",
            "--data-dir",
            data_dir.to_str().unwrap(),
        ]);
        cli.tree
    }

    #[test]
    fn test_init_creates_database_and_base() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("db").join("journal-sync.db");
        let data = temp.path().join("data");

        execute(Some(&db), &tree_args(&data), false, true).unwrap();
        assert!(db.exists());
        assert!(data.join("worlds").is_dir());
        assert!(!data.join("worlds").join("world").exists());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("journal-sync.db");
        let args = tree_args(temp.path());

        execute(Some(&db), &args, false, true).unwrap();
        let result = execute(Some(&db), &args, false, true);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));
        assert!(execute(Some(&db), &args, true, true).is_ok());
    }
}
