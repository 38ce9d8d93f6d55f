//! Disk tree scanner.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use super::filename::{MARKDOWN_EXT, parse_file_name};
use super::ledger::{LEDGER_MARKER, Ledger};
use crate::model::action::last_segment;
use crate::model::{DiskFile, DiskNode};
use crate::store::{FileStore, decode_path, join_path};
use crate::sync::SyncResult;

/// Walk `root` on the file store and build the disk tree.
///
/// Listing failures propagate; the caller decides whether a missing root
/// means "nothing on disk yet".
///
/// # Errors
///
/// Returns the store error of the first directory that cannot be listed.
pub async fn scan_disk<F: FileStore>(store: &F, root: &str) -> SyncResult<DiskNode> {
    let root = root.trim_end_matches('/');
    let node = scan_dir(store, root).await?;
    debug!(root, files = node.file_count(), "scanned disk tree");
    Ok(node)
}

fn scan_dir<'a, F: FileStore>(
    store: &'a F,
    dir: &'a str,
) -> Pin<Box<dyn Future<Output = SyncResult<DiskNode>> + Send + 'a>> {
    Box::pin(async move {
        let listing = store.list(dir).await?;

        let ledger = load_ledger(store, dir, &listing.files).await;

        let mut files = Vec::new();
        for listed in &listing.files {
            let file_name = entry_name(&listed.path);
            let file_name = file_name.as_str();
            // hidden files include interrupted upload temporaries
            if !file_name.contains(MARKDOWN_EXT) || file_name.starts_with('.') {
                continue;
            }

            let (derived_name, derived_id) = parse_file_name(file_name);
            let timestamp_secs = listed
                .modified
                .or_else(|| ledger.as_ref().and_then(|l| l.lookup(file_name)));
            files.push(DiskFile {
                file_name: file_name.to_string(),
                derived_id,
                derived_name,
                timestamp_secs,
                on_disk: true,
            });
        }

        let mut children = Vec::with_capacity(listing.dirs.len());
        for sub in &listing.dirs {
            let child_path = join_path(dir, &entry_name(sub));
            children.push(scan_dir(store, &child_path).await?);
        }

        Ok(DiskNode {
            display_name: last_segment(dir).to_string(),
            on_disk: true,
            files,
            children,
        })
    })
}

/// Decoded name of a listed entry. Only the final segment of a listed
/// path is encoded; the directory part is returned as it was requested.
fn entry_name(listed_path: &str) -> String {
    decode_path(last_segment(listed_path))
}

async fn load_ledger<F: FileStore>(
    store: &F,
    dir: &str,
    files: &[crate::store::ListedFile],
) -> Option<Ledger> {
    let mut candidates = files.iter().filter(|f| f.path.contains(LEDGER_MARKER));
    let ledger_file = candidates.next()?;
    if candidates.next().is_some() {
        warn!(dir, "multiple timestamp ledgers found; ignoring all");
        return None;
    }

    match store.fetch_text(&join_path(dir, &entry_name(&ledger_file.path))).await {
        Ok(text) => {
            let ledger = Ledger::parse(&text);
            debug!(dir, entries = ledger.len(), "loaded timestamp ledger");
            Some(ledger)
        }
        Err(e) => {
            warn!(dir, error = %e, "could not read timestamp ledger");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalFileStore, MemoryFileStore};
    use crate::sync::SyncError;

    #[tokio::test]
    async fn test_scan_parses_names_and_recurses() {
        let store = MemoryFileStore::new();
        store.add_file("w/world/Intro.md", "hi", Some(5000)).unwrap();
        store
            .add_file("w/world/Places/Harbor (j2).md", "sea", Some(100))
            .unwrap();
        store.add_file("w/world/notes.txt", "skip", Some(1)).unwrap();

        let tree = scan_disk(&store, "w/world/").await.unwrap();
        assert_eq!(tree.display_name, "world");
        assert!(tree.on_disk);
        assert_eq!(tree.files.len(), 1);
        assert_eq!(tree.files[0].derived_name, "Intro");
        assert_eq!(tree.files[0].derived_id, None);
        assert_eq!(tree.files[0].timestamp_secs, Some(5000));

        assert_eq!(tree.children.len(), 1);
        let places = &tree.children[0];
        assert_eq!(places.display_name, "Places");
        assert_eq!(places.files[0].file_name, "Harbor (j2).md");
        assert_eq!(places.files[0].derived_id.as_deref(), Some("j2"));
        assert_eq!(places.files[0].derived_name, "Harbor");
    }

    #[tokio::test]
    async fn test_ledger_is_fallback_for_timestamps() {
        let store = MemoryFileStore::without_mtime();
        store
            .add_file("w/jsTimestamps.txt", "Intro.md:1234\r\nOther.md:99\r\n", None)
            .unwrap();
        store.add_file("w/Intro.md", "hi", None).unwrap();
        store.add_file("w/Unlisted.md", "hi", None).unwrap();

        let tree = scan_disk(&store, "w").await.unwrap();
        assert_eq!(tree.files.len(), 2);
        let intro = tree.files.iter().find(|f| f.derived_name == "Intro").unwrap();
        assert_eq!(intro.timestamp_secs, Some(1234));
        let unlisted = tree
            .files
            .iter()
            .find(|f| f.derived_name == "Unlisted")
            .unwrap();
        assert_eq!(unlisted.timestamp_secs, None);
    }

    #[tokio::test]
    async fn test_percent_sequences_in_names_survive_local_scan() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("w").join("Q%41");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Note.md"), "x").unwrap();
        std::fs::write(dir.join("50%25 off.md"), "y").unwrap();
        std::fs::write(dir.join("jsTimestamps.txt"), "Note.md:77\n").unwrap();
        let store = LocalFileStore::new(temp.path());

        let tree = scan_disk(&store, "w").await.unwrap();
        assert_eq!(tree.children.len(), 1);
        let child = &tree.children[0];
        assert_eq!(child.display_name, "Q%41");

        let mut names: Vec<(&str, &str)> = child
            .files
            .iter()
            .map(|f| (f.file_name.as_str(), f.derived_name.as_str()))
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec![("50%25 off.md", "50%25 off"), ("Note.md", "Note")]);

        let store = MemoryFileStore::without_mtime();
        store.add_file("w/Q%41/Note.md", "x", None).unwrap();
        store.add_file("w/Q%41/jsTimestamps.txt", "Note.md:77\n", None).unwrap();
        let tree = scan_disk(&store, "w").await.unwrap();
        let note = &tree.children[0].files[0];
        assert_eq!(note.file_name, "Note.md");
        assert_eq!(note.timestamp_secs, Some(77));
    }

    #[tokio::test]
    async fn test_hidden_files_are_skipped() {
        let store = MemoryFileStore::new();
        store.add_file("w/.Draft.md.tmp", "x", Some(1)).unwrap();
        let tree = scan_disk(&store, "w").await.unwrap();
        assert!(tree.files.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_propagates() {
        let store = MemoryFileStore::new();
        let err = scan_disk(&store, "nope/").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }
}
