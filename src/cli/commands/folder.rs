//! Folder command implementations.

use crate::cli::FolderCommands;
use crate::config::default_actor;
use crate::error::Result;
use crate::model::{Folder, JOURNAL_KIND};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct FolderListOutput<'a> {
    folders: Vec<FolderItem<'a>>,
    count: usize,
}

#[derive(Serialize)]
struct FolderItem<'a> {
    id: &'a str,
    name: &'a str,
    parent_id: Option<&'a str>,
    displayed: bool,
    records: usize,
}

impl<'a> From<&'a Folder> for FolderItem<'a> {
    fn from(folder: &'a Folder) -> Self {
        Self {
            id: &folder.id,
            name: &folder.name,
            parent_id: folder.parent_id.as_deref(),
            displayed: folder.displayed,
            records: folder.records.len(),
        }
    }
}

/// Execute folder commands.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(
    command: &FolderCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    match command {
        FolderCommands::Create {
            name,
            parent,
            hidden,
        } => create(name, parent.as_deref(), *hidden, db_path, &actor, json),
        FolderCommands::List => list(db_path, json),
        FolderCommands::Hide { id } => set_displayed(id, false, db_path, &actor, json),
        FolderCommands::Show { id } => set_displayed(id, true, db_path, &actor, json),
    }
}

fn create(
    name: &str,
    parent: Option<&str>,
    hidden: bool,
    db_path: Option<&PathBuf>,
    actor: &str,
    json: bool,
) -> Result<()> {
    let mut storage = super::open_storage(db_path)?;
    let mut folder = storage.create_folder(name, parent, JOURNAL_KIND, actor)?;
    if hidden {
        storage.set_folder_displayed(&folder.id, false, actor)?;
        folder.displayed = false;
    }

    if json {
        println!("{}", serde_json::to_string(&FolderItem::from(&folder))?);
    } else {
        println!("Created folder: {} ({})", folder.name, folder.id);
    }
    Ok(())
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = super::open_storage(db_path)?;
    let folders = storage.list_folders(JOURNAL_KIND)?;

    if json {
        let items: Vec<FolderItem> = folders.iter().map(FolderItem::from).collect();
        let output = FolderListOutput {
            count: items.len(),
            folders: items,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if folders.is_empty() {
        println!("{}", "No folders.".dimmed());
        return Ok(());
    }
    for folder in &folders {
        let parent = folder
            .parent_id
            .as_deref()
            .map(|p| format!(" in {p}"))
            .unwrap_or_default();
        let hidden = if folder.displayed {
            String::new()
        } else {
            format!(" {}", "[hidden]".yellow())
        };
        println!(
            "{} {}{}{} {}",
            folder.id.dimmed(),
            folder.name.bold(),
            parent.dimmed(),
            hidden,
            format!("({} records)", folder.records.len()).dimmed()
        );
    }
    Ok(())
}

fn set_displayed(
    id: &str,
    displayed: bool,
    db_path: Option<&PathBuf>,
    actor: &str,
    json: bool,
) -> Result<()> {
    let mut storage = super::open_storage(db_path)?;
    storage.set_folder_displayed(id, displayed, actor)?;

    if json {
        let output = serde_json::json!({ "id": id, "displayed": displayed });
        println!("{}", serde_json::to_string(&output)?);
    } else if displayed {
        println!("Folder {id} is synced again");
    } else {
        println!("Folder {id} is hidden from the sync");
    }
    Ok(())
}
