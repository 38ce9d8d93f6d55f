//! File store backed by a directory on the local filesystem.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{FileStore, ListedFile, Listing, encode_segment, join_path};
use crate::sync::{DirCreate, SyncError, SyncResult};

/// Serves store-relative paths from under a base directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    base: PathBuf,
}

impl LocalFileStore {
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve a store-relative path, refusing anything that escapes the base.
    fn resolve(&self, path: &str) -> SyncResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(SyncError::PermissionDenied(path.to_string()));
        }
        Ok(self.base.join(relative))
    }
}

fn map_io(err: std::io::Error, path: &str) -> SyncError {
    match err.kind() {
        ErrorKind::NotFound => SyncError::NotFound(path.to_string()),
        ErrorKind::PermissionDenied => SyncError::PermissionDenied(path.to_string()),
        _ => SyncError::Io(err),
    }
}

fn modified_secs(meta: &std::fs::Metadata) -> Option<i64> {
    let elapsed = meta.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(elapsed.as_secs()).ok()
}

async fn write_synced(mut file: tokio::fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

impl FileStore for LocalFileStore {
    async fn list(&self, dir: &str) -> SyncResult<Listing> {
        let full = self.resolve(dir)?;
        let mut entries = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| map_io(e, dir))?;

        let mut listing = Listing::default();
        while let Some(entry) = entries.next_entry().await.map_err(|e| map_io(e, dir))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().await.map_err(|e| map_io(e, dir))?;
            let path = join_path(dir, &encode_segment(&name));
            if meta.is_dir() {
                listing.dirs.push(path);
            } else if meta.is_file() {
                listing.files.push(ListedFile {
                    path,
                    modified: modified_secs(&meta),
                });
            }
        }

        // read_dir order is platform-defined
        listing.files.sort_by(|a, b| a.path.cmp(&b.path));
        listing.dirs.sort();
        debug!(
            dir,
            files = listing.files.len(),
            dirs = listing.dirs.len(),
            "listed directory"
        );
        Ok(listing)
    }

    async fn fetch_text(&self, path: &str) -> SyncResult<String> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| map_io(e, path))
    }

    async fn create_directory(&self, path: &str) -> SyncResult<DirCreate> {
        let full = self.resolve(path)?;
        match tokio::fs::create_dir(&full).await {
            Ok(()) => Ok(DirCreate::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(DirCreate::AlreadyExists),
            Err(e) => Err(map_io(e, path)),
        }
    }

    /// Write to a temp file, sync it, then rename over the target so a
    /// reader never sees a half-written document.
    async fn upload(&self, dir: &str, file_name: &str, bytes: &[u8]) -> SyncResult<()> {
        let target_rel = join_path(dir, file_name);
        let target = self.resolve(&target_rel)?;
        let temp = target.with_file_name(format!(".{file_name}.tmp"));

        let file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| map_io(e, &target_rel))?;
        let written = async {
            write_synced(file, bytes).await?;
            tokio::fs::rename(&temp, &target).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(map_io(e, &target_rel));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::decode_path;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());

        assert_eq!(
            store.create_directory("world").await.unwrap(),
            DirCreate::Created
        );
        store
            .upload("world/", "Notes (42).md", b"# Notes\n")
            .await
            .unwrap();

        let listing = store.list("world/").await.unwrap();
        assert_eq!(listing.files.len(), 1);
        assert_eq!(decode_path(&listing.files[0].path), "world/Notes (42).md");
        assert!(listing.files[0].modified.is_some());
        assert!(listing.dirs.is_empty());

        let text = store.fetch_text("world/Notes (42).md").await.unwrap();
        assert_eq!(text, "# Notes\n");
    }

    #[tokio::test]
    async fn test_upload_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());

        store.upload("", "a.md", b"one").await.unwrap();
        store.upload("", "a.md", b"two").await.unwrap();

        assert_eq!(store.fetch_text("a.md").await.unwrap(), "two");
        let listing = store.list("").await.unwrap();
        assert_eq!(listing.files.len(), 1, "temp file must not linger");
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());
        std::fs::create_dir_all(temp_dir.path().join("Busy.md").join("inner")).unwrap();

        assert!(store.upload("", "Busy.md", b"text").await.is_err());
        assert!(!temp_dir.path().join(".Busy.md.tmp").exists());
    }

    #[tokio::test]
    async fn test_create_directory_twice() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());

        store.create_directory("a").await.unwrap();
        assert_eq!(
            store.create_directory("a/").await.unwrap(),
            DirCreate::AlreadyExists
        );
        let listing = store.list("").await.unwrap();
        assert_eq!(listing.dirs, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());

        assert!(matches!(
            store.list("nope/").await,
            Err(SyncError::NotFound(_))
        ));
        assert!(matches!(
            store.fetch_text("nope.md").await,
            Err(SyncError::NotFound(_))
        ));
        assert!(matches!(
            store.create_directory("x/y").await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_parent_traversal_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());

        assert!(matches!(
            store.list("../").await,
            Err(SyncError::PermissionDenied(_))
        ));
    }
}
