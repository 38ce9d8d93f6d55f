//! Shared sync types: errors, directions, and batch summaries.

use serde::Serialize;

use crate::model::ActionKind;

/// Which halves of a plan to execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Directories, folders, exports and imports.
    #[default]
    Both,
    /// Directories and exports only (records → disk).
    Export,
    /// Folders and imports only (disk → records).
    Import,
}

impl SyncDirection {
    /// Whether actions of `kind` run in this direction. Conflicts are always reported.
    #[must_use]
    pub const fn includes(&self, kind: ActionKind) -> bool {
        match (self, kind) {
            (Self::Both, _) | (_, ActionKind::Conflict) => true,
            (Self::Export, ActionKind::Mkdir | ActionKind::Export) => true,
            (Self::Import, ActionKind::Mkfolder | ActionKind::Import) => true,
            _ => false,
        }
    }
}

/// Outcome of a directory creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirCreate {
    Created,
    AlreadyExists,
}

/// Counts of what a batch did, per category.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Directories created on the file store.
    pub directories: usize,
    /// Folders created in the record store.
    pub folders: usize,
    /// Records written to disk.
    pub exported: usize,
    /// Disk files read into records.
    pub imported: usize,
    /// Documents changed on both sides.
    pub conflicts: usize,
    /// Actions deferred to a later run (unresolved parents, filtered directions).
    pub skipped: usize,
    /// Actions that failed; see logs.
    pub failed: usize,
}

impl SyncSummary {
    /// Number of actions that had an effect.
    #[must_use]
    pub fn total_applied(&self) -> usize {
        self.directories + self.folders + self.exported + self.imported
    }

    /// Returns true if nothing was applied, reported, or attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_applied() + self.conflicts + self.skipped + self.failed == 0
    }

    /// Count one successful action of `kind`.
    pub fn record_applied(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Mkdir => self.directories += 1,
            ActionKind::Mkfolder => self.folders += 1,
            ActionKind::Export => self.exported += 1,
            ActionKind::Import => self.imported += 1,
            ActionKind::Conflict => self.conflicts += 1,
        }
    }
}

/// Sync-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The two trees disagree on identity at the same position.
    #[error("Trees do not align: disk has '{disk}' where records have '{records}'")]
    StructuralMismatch {
        /// Name on the disk side.
        disk: String,
        /// Name on the record side.
        records: String,
    },

    /// A listed or fetched path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The store refused access to a path.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record store database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Any other failure reported by an external store.
    #[error("Store error: {0}")]
    Store(String),

    /// A folder action could not find its ancestor folder.
    #[error("No parent folder found for {0}")]
    UnresolvedParent(String),

    /// A record name cannot be used as a file name.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = SyncSummary::default();
        assert!(summary.is_empty());

        summary.record_applied(ActionKind::Mkdir);
        summary.record_applied(ActionKind::Export);
        summary.record_applied(ActionKind::Export);
        summary.record_applied(ActionKind::Conflict);
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.exported, 2);
        assert_eq!(summary.conflicts, 1);
        assert_eq!(summary.total_applied(), 3);
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_direction_filters() {
        assert!(SyncDirection::Export.includes(ActionKind::Mkdir));
        assert!(SyncDirection::Export.includes(ActionKind::Export));
        assert!(!SyncDirection::Export.includes(ActionKind::Import));
        assert!(!SyncDirection::Export.includes(ActionKind::Mkfolder));
        assert!(SyncDirection::Import.includes(ActionKind::Mkfolder));
        assert!(!SyncDirection::Import.includes(ActionKind::Mkdir));
        assert!(SyncDirection::Import.includes(ActionKind::Conflict));
        assert!(SyncDirection::default().includes(ActionKind::Import));
    }
}
