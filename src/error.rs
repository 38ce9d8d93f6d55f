//! Error types for the journal-sync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, 6=sync, ...)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncError;

/// Result type alias for journal-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    FolderNotFound,
    RecordNotFound,
    PathNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidFileName,

    // Sync (exit 6)
    StructuralMismatch,
    SyncError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
    PermissionDenied,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::FolderNotFound => "FOLDER_NOT_FOUND",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::PathNotFound => "PATH_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidFileName => "INVALID_FILE_NAME",
            Self::StructuralMismatch => "STRUCTURAL_MISMATCH",
            Self::SyncError => "SYNC_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::FolderNotFound | Self::RecordNotFound | Self::PathNotFound => 3,
            Self::InvalidArgument | Self::InvalidFileName => 4,
            Self::StructuralMismatch | Self::SyncError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::PermissionDenied => 8,
        }
    }

    /// Whether re-running the same command may succeed.
    ///
    /// True for validation errors and transient store failures. A
    /// structural mismatch will not fix itself without operator action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::InvalidFileName | Self::DatabaseError | Self::SyncError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in journal-sync CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `jsync init` first")]
    NotInitialized,

    #[error("Already initialized at {}", .path.display())]
    AlreadyInitialized { path: PathBuf },

    #[error("Folder not found: {id}")]
    FolderNotFound { id: String },

    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::FolderNotFound { .. } => ErrorCode::FolderNotFound,
            Self::RecordNotFound { .. } => ErrorCode::RecordNotFound,
            Self::Sync(err) => match err {
                SyncError::StructuralMismatch { .. } => ErrorCode::StructuralMismatch,
                SyncError::NotFound(_) => ErrorCode::PathNotFound,
                SyncError::PermissionDenied(_) => ErrorCode::PermissionDenied,
                SyncError::Io(_) => ErrorCode::IoError,
                SyncError::Json(_) => ErrorCode::JsonError,
                SyncError::Database(_) => ErrorCode::DatabaseError,
                SyncError::InvalidFileName(_) => ErrorCode::InvalidFileName,
                SyncError::Store(_) | SyncError::UnresolvedParent(_) => ErrorCode::SyncError,
            },
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `jsync init` to initialize the database".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to re-run init against it.",
                path.display()
            )),

            Self::FolderNotFound { id } => Some(format!(
                "No folder with ID '{id}'. Use `jsync folder list` to see available folders."
            )),

            Self::RecordNotFound { id } => Some(format!(
                "No record with ID or name '{id}'. Use `jsync record list` to see available records."
            )),

            Self::Sync(SyncError::StructuralMismatch { .. }) => Some(
                "The directory tree and the folder tree disagree on a name at the same level.\n  \
                 Rename one side so they match, then run `jsync tree` to check."
                    .to_string(),
            ),

            Self::Sync(SyncError::NotFound(path)) => Some(format!(
                "'{path}' does not exist under the data directory. Check --data-dir and --source."
            )),

            Self::Sync(SyncError::PermissionDenied(path)) => {
                Some(format!("Check filesystem permissions for '{path}'."))
            }

            Self::Config(msg) if msg.contains("source") => Some(
                "Source paths look like `[data] worlds/` or `[s3:bucket] path/`.".to_string(),
            ),

            Self::Sync(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_category() {
        assert_eq!(Error::NotInitialized.exit_code(), 2);
        assert_eq!(Error::RecordNotFound { id: "x".into() }.exit_code(), 3);
        assert_eq!(Error::InvalidArgument("bad".into()).exit_code(), 4);
        let mismatch = Error::Sync(SyncError::StructuralMismatch {
            disk: "a".into(),
            records: "b".into(),
        });
        assert_eq!(mismatch.exit_code(), 6);
        assert_eq!(Error::Config("x".into()).exit_code(), 7);
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let json = Error::NotInitialized.to_structured_json();
        assert_eq!(json["error"]["code"], "NOT_INITIALIZED");
        assert_eq!(json["error"]["exit_code"], 2);
        assert!(json["error"]["hint"].as_str().unwrap().contains("jsync init"));
    }

    #[test]
    fn test_sync_not_found_maps_to_path_code() {
        let err = Error::from(SyncError::NotFound("worlds/world/".into()));
        assert_eq!(err.error_code(), ErrorCode::PathNotFound);
        assert!(!err.error_code().is_retryable());
    }
}
