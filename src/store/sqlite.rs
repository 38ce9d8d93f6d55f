//! Record store backed by [`SqliteStorage`].

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::RecordStore;
use crate::error::Error;
use crate::model::{Folder, JOURNAL_KIND, NewRecord, Record};
use crate::storage::SqliteStorage;
use crate::sync::{SyncError, SyncResult};

const ACTOR: &str = "jsync";

/// Adapts the SQLite storage layer to the engine's [`RecordStore`] seam.
///
/// Writes made here are sync writes: they never mark records dirty.
#[derive(Debug)]
pub struct SqliteRecordStore {
    storage: Mutex<SqliteStorage>,
}

impl SqliteRecordStore {
    #[must_use]
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            storage: Mutex::new(storage),
        }
    }

    /// Give the storage back, e.g. to inspect it after a sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock was poisoned.
    pub fn into_inner(self) -> SyncResult<SqliteStorage> {
        self.storage
            .into_inner()
            .map_err(|_| SyncError::Store("record store lock poisoned".to_string()))
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, SqliteStorage>> {
        self.storage
            .lock()
            .map_err(|_| SyncError::Store("record store lock poisoned".to_string()))
    }
}

impl From<Error> for SyncError {
    fn from(err: Error) -> Self {
        match err {
            Error::Sync(inner) => inner,
            Error::Database(e) => Self::Database(e.to_string()),
            Error::Io(e) => Self::Io(e),
            Error::Json(e) => Self::Json(e),
            Error::RecordNotFound { id } | Error::FolderNotFound { id } => Self::NotFound(id),
            other => Self::Store(other.to_string()),
        }
    }
}

impl RecordStore for SqliteRecordStore {
    async fn list_folders(&self, kind: &str) -> SyncResult<Vec<Folder>> {
        Ok(self.lock()?.list_folders(kind)?)
    }

    async fn list_top_level_records(&self, kind: &str) -> SyncResult<Vec<Record>> {
        Ok(self.lock()?.list_top_level_records(kind)?)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
        kind: &str,
    ) -> SyncResult<Folder> {
        Ok(self.lock()?.create_folder(name, parent_id, kind, ACTOR)?)
    }

    async fn create_record(&self, record: NewRecord) -> SyncResult<Record> {
        Ok(self.lock()?.create_record(&record, JOURNAL_KIND, ACTOR)?)
    }

    async fn update_record_content(&self, id: &str, content: &str) -> SyncResult<()> {
        Ok(self.lock()?.update_record_content(id, content, ACTOR)?)
    }

    async fn set_flag(&self, id: &str, namespace: &str, key: &str, value: Value) -> SyncResult<()> {
        Ok(self.lock()?.set_record_flag(id, namespace, key, value, ACTOR)?)
    }
}
