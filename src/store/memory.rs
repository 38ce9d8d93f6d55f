//! In-memory file store.
//!
//! Keeps files and directories in maps behind a mutex. Used by tests and by
//! dry runs that should not touch the real tree.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{FileStore, ListedFile, Listing, encode_segment, join_path};
use crate::sync::{DirCreate, SyncError, SyncResult};

#[derive(Debug, Clone)]
struct MemFile {
    bytes: Vec<u8>,
    modified: Option<i64>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Normalized directory paths; `""` is the store root.
    dirs: BTreeSet<String>,
    files: BTreeMap<String, MemFile>,
    /// Paths whose operations fail, for exercising error handling.
    failing: HashSet<String>,
}

/// A [`FileStore`] held entirely in memory.
#[derive(Debug)]
pub struct MemoryFileStore {
    inner: Mutex<Inner>,
    /// Report modification times on listing.
    track_mtime: bool,
}

impl Default for MemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

impl MemoryFileStore {
    /// An empty store containing only the root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.dirs.insert(String::new());
        Self {
            inner: Mutex::new(inner),
            track_mtime: true,
        }
    }

    /// A store that never reports modification times.
    #[must_use]
    pub fn without_mtime() -> Self {
        Self {
            track_mtime: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| SyncError::Store("file store lock poisoned".to_string()))
    }

    /// Create a directory and all its ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn add_dir(&self, path: &str) -> SyncResult<()> {
        let mut inner = self.lock()?;
        let mut current = normalize(path);
        while !current.is_empty() {
            let parent = parent_of(&current).to_string();
            inner.dirs.insert(current);
            current = parent;
        }
        Ok(())
    }

    /// Place a file with an explicit modification time, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn add_file(&self, path: &str, text: &str, modified: Option<i64>) -> SyncResult<()> {
        let path = normalize(path);
        self.add_dir(parent_of(&path))?;
        self.lock()?.files.insert(
            path,
            MemFile {
                bytes: text.as_bytes().to_vec(),
                modified,
            },
        );
        Ok(())
    }

    /// Make every operation on `path` fail with a store error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn fail_on(&self, path: &str) -> SyncResult<()> {
        self.lock()?.failing.insert(normalize(path));
        Ok(())
    }

    /// Text of a file, if present.
    #[must_use]
    pub fn read(&self, path: &str) -> Option<String> {
        let inner = self.inner.lock().ok()?;
        let file = inner.files.get(&normalize(path))?;
        Some(String::from_utf8_lossy(&file.bytes).into_owned())
    }

    #[must_use]
    pub fn has_dir(&self, path: &str) -> bool {
        self.inner
            .lock()
            .is_ok_and(|inner| inner.dirs.contains(&normalize(path)))
    }

    /// All file paths, sorted.
    #[must_use]
    pub fn file_paths(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn check_failing(inner: &Inner, path: &str) -> SyncResult<()> {
    if inner.failing.contains(path) {
        return Err(SyncError::Store(format!("injected failure for {path}")));
    }
    Ok(())
}

fn child_name<'a>(dir: &str, path: &'a str) -> Option<&'a str> {
    if parent_of(path) != dir || path.is_empty() {
        return None;
    }
    Some(if dir.is_empty() {
        path
    } else {
        &path[dir.len() + 1..]
    })
}

impl FileStore for MemoryFileStore {
    async fn list(&self, dir: &str) -> SyncResult<Listing> {
        let key = normalize(dir);
        let inner = self.lock()?;
        check_failing(&inner, &key)?;
        if !inner.dirs.contains(&key) {
            return Err(SyncError::NotFound(dir.to_string()));
        }

        let files = inner
            .files
            .iter()
            .filter_map(|(path, file)| {
                let name = child_name(&key, path)?;
                Some(ListedFile {
                    path: join_path(&key, &encode_segment(name)),
                    modified: if self.track_mtime { file.modified } else { None },
                })
            })
            .collect();
        let dirs = inner
            .dirs
            .iter()
            .filter_map(|path| {
                let name = child_name(&key, path)?;
                Some(join_path(&key, &encode_segment(name)))
            })
            .collect();

        Ok(Listing { files, dirs })
    }

    async fn fetch_text(&self, path: &str) -> SyncResult<String> {
        let key = normalize(path);
        let inner = self.lock()?;
        check_failing(&inner, &key)?;
        let file = inner
            .files
            .get(&key)
            .ok_or_else(|| SyncError::NotFound(path.to_string()))?;
        String::from_utf8(file.bytes.clone()).map_err(|e| SyncError::Store(e.to_string()))
    }

    async fn create_directory(&self, path: &str) -> SyncResult<DirCreate> {
        let key = normalize(path);
        let mut inner = self.lock()?;
        check_failing(&inner, &key)?;
        if inner.dirs.contains(&key) {
            return Ok(DirCreate::AlreadyExists);
        }
        if !inner.dirs.contains(parent_of(&key)) {
            return Err(SyncError::NotFound(path.to_string()));
        }
        inner.dirs.insert(key);
        Ok(DirCreate::Created)
    }

    async fn upload(&self, dir: &str, file_name: &str, bytes: &[u8]) -> SyncResult<()> {
        let dir_key = normalize(dir);
        let key = join_path(&dir_key, file_name);
        let mut inner = self.lock()?;
        check_failing(&inner, &key)?;
        if !inner.dirs.contains(&dir_key) {
            return Err(SyncError::NotFound(dir.to_string()));
        }
        inner.files.insert(
            key,
            MemFile {
                bytes: bytes.to_vec(),
                modified: Some(chrono::Utc::now().timestamp()),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::decode_path;

    #[tokio::test]
    async fn test_list_immediate_children_only() {
        let store = MemoryFileStore::new();
        store.add_file("w/a.md", "a", Some(10)).unwrap();
        store.add_file("w/sub/b.md", "b", Some(20)).unwrap();

        let listing = store.list("w/").await.unwrap();
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].path, "w/a.md");
        assert_eq!(listing.files[0].modified, Some(10));
        assert_eq!(listing.dirs, vec!["w/sub".to_string()]);

        let root = store.list("").await.unwrap();
        assert_eq!(root.dirs, vec!["w".to_string()]);
        assert!(root.files.is_empty());
    }

    #[tokio::test]
    async fn test_listing_encodes_names() {
        let store = MemoryFileStore::new();
        store.add_file("w/My Notes (1).md", "x", None).unwrap();
        let listing = store.list("w").await.unwrap();
        assert_eq!(listing.files[0].path, "w/My%20Notes%20(1).md");
        assert_eq!(decode_path(&listing.files[0].path), "w/My Notes (1).md");
    }

    #[tokio::test]
    async fn test_create_directory_requires_parent() {
        let store = MemoryFileStore::new();
        assert!(matches!(
            store.create_directory("a/b").await,
            Err(SyncError::NotFound(_))
        ));
        assert_eq!(store.create_directory("a").await.unwrap(), DirCreate::Created);
        assert_eq!(
            store.create_directory("a/").await.unwrap(),
            DirCreate::AlreadyExists
        );
        assert_eq!(store.create_directory("a/b").await.unwrap(), DirCreate::Created);
        assert!(store.has_dir("a/b"));
    }

    #[tokio::test]
    async fn test_upload_stamps_mtime() {
        let store = MemoryFileStore::new();
        store.upload("", "x.md", b"hello").await.unwrap();
        let listing = store.list("").await.unwrap();
        assert!(listing.files[0].modified.is_some());
        assert_eq!(store.read("x.md").as_deref(), Some("hello"));

        let quiet = MemoryFileStore::without_mtime();
        quiet.upload("", "x.md", b"hello").await.unwrap();
        assert_eq!(quiet.list("").await.unwrap().files[0].modified, None);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryFileStore::new();
        store.fail_on("w/bad.md").unwrap();
        store.add_dir("w").unwrap();
        assert!(matches!(
            store.upload("w", "bad.md", b"x").await,
            Err(SyncError::Store(_))
        ));
        store.upload("w", "good.md", b"x").await.unwrap();
    }
}
