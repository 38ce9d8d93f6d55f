//! SQLite storage implementation.
//!
//! This module provides the host record store for journal-sync using SQLite.
//! It follows the MutationContext pattern for transaction discipline: user
//! edits mark records dirty inside the mutation, and the dirty marks are
//! applied to the sync flags right before commit.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Transaction};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{
    FLAG_EXPORT_DIRTY, FLAG_LAST_MODIFIED, FLAG_NAMESPACE, Folder, NewRecord, Record,
};
use crate::storage::schema::apply_schema;

/// How long a write waits on another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// Passed to mutation closures so user-facing edits can mark the records
/// they touched as changed since their last export.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// IDs of records marked dirty for export.
    pub dirty_records: HashSet<String>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            dirty_records: HashSet::new(),
        }
    }

    /// Mark a record as changed since its last export.
    pub fn mark_record_dirty(&mut self, record_id: &str) {
        self.dirty_records.insert(record_id.to_string());
    }
}

/// Field changes for a user-facing record edit. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct RecordChanges<'a> {
    pub name: Option<&'a str>,
    pub content: Option<&'a str>,
    /// `Some(None)` moves the record to the top level.
    pub folder_id: Option<Option<&'a str>>,
}

impl RecordChanges<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none() && self.folder_id.is_none()
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Stamps `ExportDirty` and `LastModified` on every record marked dirty
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        if !ctx.dirty_records.is_empty() {
            let now = chrono::Utc::now().timestamp_millis();
            for id in &ctx.dirty_records {
                write_flag(&tx, id, FLAG_NAMESPACE, FLAG_EXPORT_DIRTY, Value::Bool(true))?;
                write_flag(&tx, id, FLAG_NAMESPACE, FLAG_LAST_MODIFIED, Value::from(now))?;
            }
        }

        tx.commit()?;
        debug!(
            op = %ctx.op_name,
            actor = %ctx.actor,
            dirty = ctx.dirty_records.len(),
            "mutation committed"
        );

        Ok(result)
    }

    // ==================
    // Folder Operations
    // ==================

    /// Create a new folder.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if `parent_id` does not exist, or an error if the insert fails.
    pub fn create_folder(
        &mut self,
        name: &str,
        parent_id: Option<&str>,
        kind: &str,
        actor: &str,
    ) -> Result<Folder> {
        let id = format!("fold_{}", &uuid::Uuid::new_v4().to_string()[..12]);
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("create_folder", actor, |tx, _ctx| {
            if let Some(parent) = parent_id {
                let exists: Option<i64> = tx
                    .query_row("SELECT 1 FROM folders WHERE id = ?1", [parent], |row| {
                        row.get(0)
                    })
                    .optional()?;
                if exists.is_none() {
                    return Err(Error::FolderNotFound {
                        id: parent.to_string(),
                    });
                }
            }

            tx.execute(
                "INSERT INTO folders (id, name, parent_id, kind, displayed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                rusqlite::params![id, name, parent_id, kind, now],
            )?;
            Ok(())
        })?;

        Ok(Folder {
            id,
            name: name.to_string(),
            parent_id: parent_id.map(ToString::to_string),
            kind: kind.to_string(),
            displayed: true,
            records: Vec::new(),
        })
    }

    /// Show or hide a folder. Hidden folders are not synced.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if the folder does not exist.
    pub fn set_folder_displayed(&mut self, id: &str, displayed: bool, actor: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.mutate("set_folder_displayed", actor, |tx, _ctx| {
            let rows = tx.execute(
                "UPDATE folders SET displayed = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![displayed, now, id],
            )?;
            if rows == 0 {
                return Err(Error::FolderNotFound { id: id.to_string() });
            }
            Ok(())
        })
    }

    /// Get a folder by ID, without its records.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_folder(&self, id: &str) -> Result<Option<Folder>> {
        let folder = self
            .conn
            .query_row(
                "SELECT id, name, parent_id, kind, displayed FROM folders WHERE id = ?1",
                [id],
                map_folder,
            )
            .optional()?;
        Ok(folder)
    }

    /// List every folder of `kind` with its direct records, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_folders(&self, kind: &str) -> Result<Vec<Folder>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, parent_id, kind, displayed FROM folders
             WHERE kind = ?1 ORDER BY rowid",
        )?;
        let mut folders = stmt
            .query_map([kind], map_folder)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut rec_stmt = self.conn.prepare(
            "SELECT id, name, content, folder_id, flags FROM records
             WHERE folder_id = ?1 ORDER BY rowid",
        )?;
        for folder in &mut folders {
            folder.records = rec_stmt
                .query_map([&folder.id], map_record)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
        }

        Ok(folders)
    }

    // ==================
    // Record Operations
    // ==================

    /// Create a record with explicit sync flags.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if the folder does not exist, or an error if the insert fails.
    pub fn create_record(&mut self, new: &NewRecord, kind: &str, actor: &str) -> Result<Record> {
        let id = format!("rec_{}", &uuid::Uuid::new_v4().to_string()[..12]);
        let now = chrono::Utc::now().timestamp_millis();

        let mut flags = Map::new();
        flags.insert(
            FLAG_NAMESPACE.to_string(),
            serde_json::json!({
                FLAG_EXPORT_DIRTY: new.export_dirty,
                FLAG_LAST_MODIFIED: new.last_modified_ms,
            }),
        );
        let flags_text = serde_json::to_string(&flags)?;

        self.mutate("create_record", actor, |tx, _ctx| {
            if let Some(folder_id) = new.folder_id.as_deref() {
                ensure_folder(tx, folder_id)?;
            }
            tx.execute(
                "INSERT INTO records (id, name, content, folder_id, kind, flags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![id, new.name, new.content, new.folder_id, kind, flags_text, now],
            )?;
            Ok(())
        })?;

        Ok(Record {
            id,
            name: new.name.clone(),
            content: new.content.clone(),
            folder_id: new.folder_id.clone(),
            flags,
        })
    }

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_record(&self, id: &str) -> Result<Option<Record>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, name, content, folder_id, flags FROM records WHERE id = ?1",
                [id],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Find records of `kind` by exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_records_by_name(&self, name: &str, kind: &str) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, content, folder_id, flags FROM records
             WHERE name = ?1 AND kind = ?2 ORDER BY rowid",
        )?;
        let records = stmt
            .query_map([name, kind], map_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// List records of `kind`, optionally restricted to one folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_records(&self, kind: &str, folder_id: Option<&str>) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, content, folder_id, flags FROM records
             WHERE kind = ?1 AND (?2 IS NULL OR folder_id = ?2) ORDER BY rowid",
        )?;
        let records = stmt
            .query_map(rusqlite::params![kind, folder_id], map_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// List records of `kind` that are not inside any folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_top_level_records(&self, kind: &str) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, content, folder_id, flags FROM records
             WHERE kind = ?1 AND folder_id IS NULL ORDER BY rowid",
        )?;
        let records = stmt
            .query_map([kind], map_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Apply a user edit to a record.
    ///
    /// Any change to name, content, or folder marks the record dirty for
    /// export and stamps its last-modified time.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` or `FolderNotFound`, or an error if the update fails.
    pub fn update_record(&mut self, id: &str, changes: &RecordChanges<'_>, actor: &str) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().timestamp_millis();

        // Build dynamic UPDATE query based on provided fields
        let mut set_clauses = vec!["updated_at = ?"];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

        if let Some(name) = changes.name {
            set_clauses.push("name = ?");
            params.push(Box::new(name.to_string()));
        }
        if let Some(content) = changes.content {
            set_clauses.push("content = ?");
            params.push(Box::new(content.to_string()));
        }
        if let Some(folder_id) = changes.folder_id {
            set_clauses.push("folder_id = ?");
            params.push(Box::new(folder_id.map(ToString::to_string)));
        }

        self.mutate("update_record", actor, |tx, ctx| {
            if let Some(Some(folder_id)) = changes.folder_id {
                ensure_folder(tx, folder_id)?;
            }

            let sql = format!("UPDATE records SET {} WHERE id = ?", set_clauses.join(", "));
            params.push(Box::new(id.to_string()));
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            let rows = tx.execute(&sql, param_refs.as_slice())?;
            if rows == 0 {
                return Err(Error::RecordNotFound { id: id.to_string() });
            }

            ctx.mark_record_dirty(id);
            Ok(())
        })
    }

    /// Replace a record's content without touching its sync flags.
    ///
    /// Used by imports, which stamp the flags themselves.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the record does not exist.
    pub fn update_record_content(&mut self, id: &str, content: &str, actor: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.mutate("update_record_content", actor, |tx, _ctx| {
            let rows = tx.execute(
                "UPDATE records SET content = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![content, now, id],
            )?;
            if rows == 0 {
                return Err(Error::RecordNotFound { id: id.to_string() });
            }
            Ok(())
        })
    }

    /// Write one flag value on a record.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the record does not exist.
    pub fn set_record_flag(
        &mut self,
        id: &str,
        namespace: &str,
        key: &str,
        value: Value,
        actor: &str,
    ) -> Result<()> {
        self.mutate("set_record_flag", actor, |tx, _ctx| {
            write_flag(tx, id, namespace, key, value)
        })
    }

    /// Count folders and records of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn counts(&self, kind: &str) -> Result<(usize, usize)> {
        let folders: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM folders WHERE kind = ?1", [kind], |row| {
                    row.get(0)
                })?;
        let records: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM records WHERE kind = ?1", [kind], |row| {
                    row.get(0)
                })?;
        Ok((
            usize::try_from(folders).unwrap_or_default(),
            usize::try_from(records).unwrap_or_default(),
        ))
    }
}

fn ensure_folder(tx: &Transaction, folder_id: &str) -> Result<()> {
    let exists: Option<i64> = tx
        .query_row("SELECT 1 FROM folders WHERE id = ?1", [folder_id], |row| {
            row.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(Error::FolderNotFound {
            id: folder_id.to_string(),
        });
    }
    Ok(())
}

/// Read-modify-write of a single flag inside the record's JSON flag object.
fn write_flag(tx: &Transaction, id: &str, namespace: &str, key: &str, value: Value) -> Result<()> {
    let flags_text: Option<String> = tx
        .query_row("SELECT flags FROM records WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    let Some(flags_text) = flags_text else {
        return Err(Error::RecordNotFound { id: id.to_string() });
    };

    let mut record = Record {
        id: id.to_string(),
        name: String::new(),
        content: String::new(),
        folder_id: None,
        flags: parse_flags(&flags_text),
    };
    record.set_flag(namespace, key, value);

    tx.execute(
        "UPDATE records SET flags = ?1 WHERE id = ?2",
        rusqlite::params![serde_json::to_string(&record.flags)?, id],
    )?;
    Ok(())
}

fn parse_flags(text: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn map_folder(row: &rusqlite::Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        kind: row.get(3)?,
        displayed: row.get(4)?,
        records: Vec::new(),
    })
}

fn map_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
    let flags: String = row.get(4)?;
    Ok(Record {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        folder_id: row.get(3)?,
        flags: parse_flags(&flags),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JOURNAL_KIND;

    fn new_record(name: &str, folder_id: Option<&str>) -> NewRecord {
        NewRecord {
            name: name.to_string(),
            content: "<p>text</p>".to_string(),
            folder_id: folder_id.map(ToString::to_string),
            export_dirty: false,
            last_modified_ms: 1_000,
        }
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_file_sets_busy_timeout() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = SqliteStorage::open(&temp.path().join("j.db")).unwrap();
        let timeout: i64 = storage
            .conn()
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5_000);
    }

    #[test]
    fn test_folder_tree_crud() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let places = storage
            .create_folder("Places", None, JOURNAL_KIND, "test")
            .unwrap();
        let towns = storage
            .create_folder("Towns", Some(&places.id), JOURNAL_KIND, "test")
            .unwrap();
        assert_eq!(towns.parent_id.as_deref(), Some(places.id.as_str()));

        storage
            .create_record(&new_record("Harbor", Some(&towns.id)), JOURNAL_KIND, "test")
            .unwrap();

        let folders = storage.list_folders(JOURNAL_KIND).unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].name, "Places");
        assert!(folders[0].records.is_empty());
        assert_eq!(folders[1].records.len(), 1);
        assert_eq!(folders[1].records[0].name, "Harbor");

        assert!(storage.list_folders("Other").unwrap().is_empty());
    }

    #[test]
    fn test_create_folder_with_missing_parent() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage
            .create_folder("Orphan", Some("fold_missing"), JOURNAL_KIND, "test")
            .unwrap_err();
        assert!(matches!(err, Error::FolderNotFound { .. }));
    }

    #[test]
    fn test_create_record_sets_flags() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let record = storage
            .create_record(&new_record("Intro", None), JOURNAL_KIND, "test")
            .unwrap();

        let loaded = storage.get_record(&record.id).unwrap().unwrap();
        assert!(!loaded.export_dirty());
        assert_eq!(loaded.last_modified_ms(), Some(1_000));
        assert_eq!(storage.list_top_level_records(JOURNAL_KIND).unwrap().len(), 1);
    }

    #[test]
    fn test_user_edit_marks_dirty() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let record = storage
            .create_record(&new_record("Intro", None), JOURNAL_KIND, "test")
            .unwrap();

        let changes = RecordChanges {
            content: Some("<p>edited</p>"),
            ..RecordChanges::default()
        };
        storage.update_record(&record.id, &changes, "test").unwrap();

        let loaded = storage.get_record(&record.id).unwrap().unwrap();
        assert_eq!(loaded.content, "<p>edited</p>");
        assert!(loaded.export_dirty());
        assert!(loaded.last_modified_ms().unwrap() > 1_000);
    }

    #[test]
    fn test_move_record_to_top_level() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let folder = storage
            .create_folder("Places", None, JOURNAL_KIND, "test")
            .unwrap();
        let record = storage
            .create_record(&new_record("Harbor", Some(&folder.id)), JOURNAL_KIND, "test")
            .unwrap();

        let changes = RecordChanges {
            folder_id: Some(None),
            ..RecordChanges::default()
        };
        storage.update_record(&record.id, &changes, "test").unwrap();

        let loaded = storage.get_record(&record.id).unwrap().unwrap();
        assert_eq!(loaded.folder_id, None);
        assert!(loaded.export_dirty());
    }

    #[test]
    fn test_sync_writes_do_not_mark_dirty() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let record = storage
            .create_record(&new_record("Intro", None), JOURNAL_KIND, "test")
            .unwrap();

        storage
            .update_record_content(&record.id, "<p>imported</p>", "sync")
            .unwrap();
        storage
            .set_record_flag(&record.id, "other", "Key", Value::from(7), "sync")
            .unwrap();

        let loaded = storage.get_record(&record.id).unwrap().unwrap();
        assert_eq!(loaded.content, "<p>imported</p>");
        assert!(!loaded.export_dirty());
        assert_eq!(loaded.last_modified_ms(), Some(1_000));
        assert_eq!(loaded.get_flag("other", "Key"), Some(&Value::from(7)));
    }

    #[test]
    fn test_update_missing_record() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let changes = RecordChanges {
            name: Some("x"),
            ..RecordChanges::default()
        };
        let err = storage.update_record("rec_missing", &changes, "test").unwrap_err();
        assert!(matches!(err, Error::RecordNotFound { .. }));

        let err = storage
            .set_record_flag("rec_missing", FLAG_NAMESPACE, FLAG_EXPORT_DIRTY, Value::Bool(false), "t")
            .unwrap_err();
        assert!(matches!(err, Error::RecordNotFound { .. }));
    }

    #[test]
    fn test_hidden_folder_flag() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let folder = storage
            .create_folder("Secret", None, JOURNAL_KIND, "test")
            .unwrap();
        storage.set_folder_displayed(&folder.id, false, "test").unwrap();
        let loaded = storage.get_folder(&folder.id).unwrap().unwrap();
        assert!(!loaded.displayed);
    }
}
