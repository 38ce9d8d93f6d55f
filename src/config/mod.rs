//! Configuration management.
//!
//! This module resolves where the journal database lives, where the Markdown
//! tree lives, and which parts of either side are left out of the sync.
//!
//! # Architecture
//!
//! - **Database**: a single global database at `~/.journal-sync/data/journal-sync.db`
//! - **Markdown tree**: `<data dir>/<source path>/<import path>`, addressed through
//!   a [`crate::store::FileStore`]
//!
//! The final segment of the sync root names the root of both trees.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// Get the global journal-sync directory location.
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".journal-sync"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `JSYNC_TEST_DB=1` (or any non-empty value).
/// This redirects all database operations to an isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("JSYNC_TEST_DB").is_ok_and(|v| is_truthy_env(&v))
}

fn is_truthy_env(value: &str) -> bool {
    !value.is_empty() && value != "0" && value.to_lowercase() != "false"
}

/// Get the test database path.
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("test").join("journal-sync.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided (`--db` or `JSYNC_DB`), use it directly
/// 2. `JSYNC_TEST_DB` environment variable → uses test database
/// 3. Global location: `~/.journal-sync/data/journal-sync.db`
///
/// Returns `None` if no home directory can be determined.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    global_dir().map(|dir| dir.join("data").join("journal-sync.db"))
}

/// Get the default actor name recorded on mutations.
///
/// `JSYNC_ACTOR`, then `USER`, then `"unknown"`.
#[must_use]
pub fn default_actor() -> String {
    std::env::var("JSYNC_ACTOR")
        .ok()
        .filter(|a| !a.is_empty())
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

// ── Source path ───────────────────────────────────────────────

/// Where the Markdown tree lives: `"[store:bucket] path"` or a bare path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePath {
    /// Storage backend name (`data` by default).
    pub store: String,
    pub bucket: Option<String>,
    /// Path inside the store, as written.
    pub current: String,
}

impl SourcePath {
    /// Parse a source setting. Input that does not match the bracket form is
    /// taken as a bare path on the `data` store.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        if let Some(parsed) = Self::parse_bracketed(input) {
            return parsed;
        }
        Self {
            store: "data".to_string(),
            bucket: None,
            current: input.to_string(),
        }
    }

    fn parse_bracketed(input: &str) -> Option<Self> {
        let open = input.find('[')?;
        let close = open + 1 + input[open + 1..].rfind(']')?;
        let source = &input[open + 1..close];
        let current = input[close + 1..].trim();
        if source.is_empty() || current.is_empty() {
            return None;
        }

        let mut parts = source.split(':');
        let store = parts.next().unwrap_or_default().to_string();
        let bucket = parts.next().map(ToString::to_string);
        Some(Self {
            store,
            bucket,
            current: current.to_string(),
        })
    }

    /// The path with backslashes turned into `/` and a trailing `/`.
    #[must_use]
    pub fn normalized(&self) -> String {
        with_trailing_slash(&self.current.replace('\\', "/"))
    }
}

impl std::fmt::Display for SourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.bucket {
            Some(bucket) => write!(f, "[{}:{}] {}", self.store, bucket, self.current),
            None => write!(f, "[{}] {}", self.store, self.current),
        }
    }
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

// ── Skip rules ────────────────────────────────────────────────

/// Folder and document names excluded from the sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipRules {
    pub folders: Vec<String>,
    pub entries: Vec<String>,
}

impl SkipRules {
    /// Build from comma-separated lists. Empty items are dropped.
    #[must_use]
    pub fn from_lists(folders: &str, entries: &str) -> Self {
        Self {
            folders: split_list(folders),
            entries: split_list(entries),
        }
    }

    #[must_use]
    pub fn skips_folder(&self, name: &str) -> bool {
        self.folders.iter().any(|f| f == name)
    }

    #[must_use]
    pub fn skips_entry(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.entries.is_empty()
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

// ── Sync settings ─────────────────────────────────────────────

/// Everything a sync run needs to locate both trees.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSettings {
    pub source: SourcePath,
    /// Name used when no import path is set.
    pub world: String,
    /// Path under the source holding this world's tree; empty means `<world>/`.
    pub import_path: String,
    pub skip: SkipRules,
    /// Base directory of the local file store.
    pub data_dir: PathBuf,
}

impl SyncSettings {
    /// Validate raw settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the world name is empty or the sync root contains `..`.
    pub fn new(
        source: &str,
        world: &str,
        import_path: &str,
        skip: SkipRules,
        data_dir: PathBuf,
    ) -> Result<Self> {
        let world = world.trim();
        if world.is_empty() {
            return Err(Error::Config("world name must not be empty".to_string()));
        }
        let settings = Self {
            source: SourcePath::parse(source),
            world: world.to_string(),
            import_path: import_path.trim().to_string(),
            skip,
            data_dir,
        };
        if settings.sync_root().split('/').any(|seg| seg == "..") {
            return Err(Error::Config(format!(
                "source path may not leave the data directory: {}",
                settings.sync_root()
            )));
        }
        Ok(settings)
    }

    /// The import path with defaults applied and a trailing `/`.
    #[must_use]
    pub fn world_path(&self) -> String {
        if self.import_path.is_empty() {
            format!("{}/", self.world)
        } else {
            with_trailing_slash(&self.import_path.replace('\\', "/"))
        }
    }

    /// Store-relative path of the directory being synced, with trailing `/`.
    #[must_use]
    pub fn sync_root(&self) -> String {
        collapse_slashes(&format!("{}{}", self.source.normalized(), self.world_path()))
    }

    /// Directory containing the sync root; action paths are relative to it.
    #[must_use]
    pub fn sync_base(&self) -> String {
        let root = self.sync_root();
        let trimmed = root.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(i) => trimmed[..=i].to_string(),
            None => String::new(),
        }
    }

    /// Final segment of the sync root; both tree roots carry this name.
    #[must_use]
    pub fn root_name(&self) -> String {
        crate::model::action::last_segment(&self.sync_root()).to_string()
    }
}

/// Replace every run of `/` with a single `/`.
#[must_use]
pub fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(source: &str, import_path: &str) -> SyncSettings {
        SyncSettings::new(
            source,
            "world",
            import_path,
            SkipRules::default(),
            PathBuf::from("."),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        let result = resolve_db_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_resolve_db_path_defaults_to_global() {
        let path = resolve_db_path(None).unwrap();
        assert!(path.ends_with("journal-sync.db"));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_dir().unwrap();
        let test = test_db_path().unwrap();
        assert!(test.starts_with(global.join("test")));
        assert_ne!(global.join("data").join("journal-sync.db"), test);
    }

    #[test]
    fn test_truthy_env_values() {
        assert!(!is_truthy_env(""));
        assert!(!is_truthy_env("0"));
        assert!(!is_truthy_env("FALSE"));
        assert!(is_truthy_env("1"));
        assert!(is_truthy_env("yes"));
    }

    #[test]
    fn test_parse_source_with_bucket() {
        let src = SourcePath::parse("[s3:my-bucket] some/dir");
        assert_eq!(src.store, "s3");
        assert_eq!(src.bucket.as_deref(), Some("my-bucket"));
        assert_eq!(src.current, "some/dir");
        assert_eq!(src.to_string(), "[s3:my-bucket] some/dir");
    }

    #[test]
    fn test_parse_source_without_bucket() {
        let src = SourcePath::parse("[data]   worlds ");
        assert_eq!(src.store, "data");
        assert_eq!(src.bucket, None);
        assert_eq!(src.current, "worlds");
    }

    #[test]
    fn test_parse_bare_source() {
        let src = SourcePath::parse("journals\\export");
        assert_eq!(src.store, "data");
        assert_eq!(src.current, "journals\\export");
        assert_eq!(src.normalized(), "journals/export/");
    }

    #[test]
    fn test_sync_root_defaults_to_world() {
        let s = settings("[data] worlds", "");
        assert_eq!(s.sync_root(), "worlds/world/");
        assert_eq!(s.sync_base(), "worlds/");
        assert_eq!(s.root_name(), "world");
    }

    #[test]
    fn test_sync_root_with_import_path() {
        let s = settings("worlds/", "campaigns/second");
        assert_eq!(s.sync_root(), "worlds/campaigns/second/");
        assert_eq!(s.sync_base(), "worlds/campaigns/");
        assert_eq!(s.root_name(), "second");

        let top = settings("", "notes");
        assert_eq!(top.sync_root(), "/notes/");
        assert_eq!(top.sync_base(), "/");
        assert_eq!(top.root_name(), "notes");
    }

    #[test]
    fn test_parent_segments_rejected() {
        let err = SyncSettings::new(
            "../outside",
            "world",
            "",
            SkipRules::default(),
            PathBuf::from("."),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_skip_rules_ignore_empty_items() {
        let rules = SkipRules::from_lists("Secret, ,Drafts", "");
        assert_eq!(rules.folders, vec!["Secret".to_string(), "Drafts".to_string()]);
        assert!(rules.entries.is_empty());
        assert!(rules.skips_folder("Drafts"));
        assert!(!rules.skips_folder(""));
        assert!(!rules.skips_entry("Secret"));
    }

    #[test]
    fn test_collapse_slashes() {
        assert_eq!(collapse_slashes("worlds//world///Places"), "worlds/world/Places");
        assert_eq!(collapse_slashes("/a/"), "/a/");
    }
}
