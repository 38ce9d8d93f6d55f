//! Record command implementations.
//!
//! Edits made here are user edits: they mark the record for export on the
//! next sync.

use crate::cli::RecordCommands;
use crate::config::default_actor;
use crate::error::{Error, Result};
use crate::model::{JOURNAL_KIND, NewRecord, Record};
use crate::storage::{RecordChanges, SqliteStorage};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct RecordListOutput<'a> {
    records: Vec<RecordItem<'a>>,
    count: usize,
}

#[derive(Serialize)]
struct RecordItem<'a> {
    id: &'a str,
    name: &'a str,
    folder_id: Option<&'a str>,
    export_dirty: bool,
    last_modified: Option<i64>,
}

impl<'a> From<&'a Record> for RecordItem<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            id: &record.id,
            name: &record.name,
            folder_id: record.folder_id.as_deref(),
            export_dirty: record.export_dirty(),
            last_modified: record.last_modified_ms(),
        }
    }
}

/// Execute record commands.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(
    command: &RecordCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    match command {
        RecordCommands::Create {
            name,
            content,
            folder,
        } => create(name, content, folder.as_deref(), db_path, &actor, json),
        RecordCommands::Edit {
            id,
            name,
            content,
            folder,
            top_level,
        } => {
            let folder_id = if *top_level {
                Some(None)
            } else {
                folder.as_deref().map(Some)
            };
            let changes = RecordChanges {
                name: name.as_deref(),
                content: content.as_deref(),
                folder_id,
            };
            edit(id, &changes, db_path, &actor, json)
        }
        RecordCommands::List { folder } => list(folder.as_deref(), db_path, json),
        RecordCommands::Show { id } => show(id, db_path, json),
    }
}

fn create(
    name: &str,
    content: &str,
    folder: Option<&str>,
    db_path: Option<&PathBuf>,
    actor: &str,
    json: bool,
) -> Result<()> {
    let mut storage = super::open_storage(db_path)?;
    let record = storage.create_record(
        &NewRecord {
            name: name.to_string(),
            content: content.to_string(),
            folder_id: folder.map(ToString::to_string),
            export_dirty: true,
            last_modified_ms: chrono::Utc::now().timestamp_millis(),
        },
        JOURNAL_KIND,
        actor,
    )?;

    if json {
        println!("{}", serde_json::to_string(&RecordItem::from(&record))?);
    } else {
        println!("Created record: {} ({})", record.name, record.id);
    }
    Ok(())
}

fn edit(
    id: &str,
    changes: &RecordChanges<'_>,
    db_path: Option<&PathBuf>,
    actor: &str,
    json: bool,
) -> Result<()> {
    if changes.is_empty() {
        return Err(Error::InvalidArgument(
            "Nothing to change: pass --name, --content, --folder or --top-level".to_string(),
        ));
    }

    let mut storage = super::open_storage(db_path)?;
    storage.update_record(id, changes, actor)?;
    let record = storage
        .get_record(id)?
        .ok_or_else(|| Error::RecordNotFound { id: id.to_string() })?;

    if json {
        println!("{}", serde_json::to_string(&RecordItem::from(&record))?);
    } else {
        println!("Updated record: {} ({})", record.name, record.id);
    }
    Ok(())
}

fn list(folder: Option<&str>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = super::open_storage(db_path)?;
    let records = storage.list_records(JOURNAL_KIND, folder)?;

    if json {
        let items: Vec<RecordItem> = records.iter().map(RecordItem::from).collect();
        let output = RecordListOutput {
            count: items.len(),
            records: items,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "No records.".dimmed());
        return Ok(());
    }
    for record in &records {
        let marker = if record.export_dirty() {
            "*".yellow()
        } else {
            " ".normal()
        };
        println!("{marker} {} {}", record.id.dimmed(), record.name);
    }
    Ok(())
}

/// Find a record by ID, falling back to an exact, unambiguous name.
fn find_record(storage: &SqliteStorage, id_or_name: &str) -> Result<Record> {
    if let Some(record) = storage.get_record(id_or_name)? {
        return Ok(record);
    }
    let mut by_name = storage.find_records_by_name(id_or_name, JOURNAL_KIND)?;
    match by_name.len() {
        1 => Ok(by_name.remove(0)),
        0 => Err(Error::RecordNotFound {
            id: id_or_name.to_string(),
        }),
        n => Err(Error::InvalidArgument(format!(
            "{n} records are named '{id_or_name}'; use the record ID"
        ))),
    }
}

fn show(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = super::open_storage(db_path)?;
    let record = find_record(&storage, id)?;

    if json {
        println!("{}", serde_json::to_string(&record)?);
        return Ok(());
    }

    println!("{}", record.name.bold().underline());
    println!("  ID:      {}", record.id);
    if let Some(folder) = &record.folder_id {
        println!("  Folder:  {folder}");
    }
    if record.export_dirty() {
        println!("  Status:  {}", "changed since last export".yellow());
    }
    println!();
    println!("{}", record.content);
    Ok(())
}
