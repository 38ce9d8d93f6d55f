//! Action executors and the batch runner.
//!
//! Actions run grouped by kind: folders by ascending depth, then directories
//! by ascending depth, then exports, then imports. Actions inside a group
//! run concurrently. A failed action is logged and counted; the rest of the
//! batch goes on.

use std::collections::BTreeMap;
use std::sync::Mutex;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::content::is_structured_content;
use super::engine::SyncEngine;
use super::filename::{generate_file_name, is_valid_file_name};
use crate::config::collapse_slashes;
use crate::model::action::last_segment;
use crate::model::{
    Action, ActionKind, FLAG_EXPORT_DIRTY, FLAG_LAST_MODIFIED, FLAG_NAMESPACE, FolderRef,
    NewRecord, UnifiedLeaf,
};
use crate::store::{Codec, FileStore, RecordStore, join_path};
use crate::sync::{DirCreate, SyncDirection, SyncError, SyncResult, SyncSummary};

/// Folders created during the current batch, keyed by action path.
///
/// Lets a child `mkfolder` or an `import` find a parent created moments
/// earlier without a rescan. Lives for one batch only.
#[derive(Debug, Default)]
struct BatchContext {
    created: Mutex<Vec<(String, FolderRef)>>,
}

impl BatchContext {
    fn remember(&self, path: &str, folder: FolderRef) {
        if let Ok(mut created) = self.created.lock() {
            created.push((path.to_string(), folder));
        }
    }

    fn lookup(&self, path: &str) -> Option<FolderRef> {
        let created = self.created.lock().ok()?;
        created
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, folder)| folder.clone())
    }
}

/// Result of one successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    /// Nothing to do, e.g. the directory already existed.
    Unchanged,
}

/// Execute `actions` in dependency order and summarize what happened.
pub async fn run_batch<F, R, C>(
    engine: &SyncEngine<'_, F, R, C>,
    actions: &[Action],
    direction: SyncDirection,
) -> SyncSummary
where
    F: FileStore,
    R: RecordStore,
    C: Codec,
{
    let batch = BatchContext::default();
    let mut summary = SyncSummary::default();

    let selected: Vec<&Action> = actions
        .iter()
        .filter(|a| {
            let keep = direction.includes(a.kind);
            if !keep {
                summary.skipped += 1;
            }
            keep
        })
        .collect();

    for group in depth_groups(&selected, ActionKind::Mkfolder) {
        let results = join_all(group.iter().map(|a| make_folder(engine, &batch, a))).await;
        tally(&mut summary, &group, results);
    }

    for group in depth_groups(&selected, ActionKind::Mkdir) {
        let results = join_all(group.iter().map(|a| make_directory(engine, a))).await;
        tally(&mut summary, &group, results);
    }

    let exports = of_kind(&selected, ActionKind::Export);
    let results = join_all(exports.iter().map(|a| export_leaf(engine, a))).await;
    tally(&mut summary, &exports, results);

    let imports = of_kind(&selected, ActionKind::Import);
    let results = join_all(imports.iter().map(|a| import_leaf(engine, &batch, a))).await;
    tally(&mut summary, &imports, results);

    for conflict in of_kind(&selected, ActionKind::Conflict) {
        warn!(
            path = %conflict.path,
            name = %conflict.name,
            "changed on disk and in records; resolve by hand"
        );
        summary.record_applied(ActionKind::Conflict);
    }

    summary
}

fn of_kind<'a>(actions: &[&'a Action], kind: ActionKind) -> Vec<&'a Action> {
    actions.iter().copied().filter(|a| a.kind == kind).collect()
}

fn depth_groups<'a>(actions: &[&'a Action], kind: ActionKind) -> Vec<Vec<&'a Action>> {
    let mut groups: BTreeMap<usize, Vec<&'a Action>> = BTreeMap::new();
    for action in of_kind(actions, kind) {
        groups.entry(action.depth).or_default().push(action);
    }
    groups.into_values().collect()
}

fn tally(summary: &mut SyncSummary, actions: &[&Action], results: Vec<SyncResult<Outcome>>) {
    for (action, result) in actions.iter().zip(results) {
        match result {
            Ok(Outcome::Applied) => summary.record_applied(action.kind),
            Ok(Outcome::Unchanged) => {}
            Err(SyncError::UnresolvedParent(path)) => {
                warn!(kind = %action.kind, %path, name = %action.name, "no parent folder yet; deferred");
                summary.skipped += 1;
            }
            Err(e) => {
                warn!(kind = %action.kind, path = %action.path, name = %action.name, error = %e, "action failed");
                summary.failed += 1;
            }
        }
    }
}

/// Store-relative path for an action path.
fn store_path(base: &str, action_path: &str) -> String {
    collapse_slashes(&format!("{base}/{action_path}"))
}

fn parent_path(path: &str) -> &str {
    path.trim_end_matches('/').rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Find the folder backing the directory at `dir_path`: first among folders
/// created in this batch, then by name in the record store.
async fn resolve_folder_at<F, R, C>(
    engine: &SyncEngine<'_, F, R, C>,
    batch: &BatchContext,
    dir_path: &str,
) -> SyncResult<Option<FolderRef>>
where
    F: FileStore,
    R: RecordStore,
    C: Codec,
{
    if let Some(folder) = batch.lookup(dir_path) {
        return Ok(Some(folder));
    }
    let name = last_segment(dir_path);
    let folders = engine.records.list_folders(&engine.kind).await?;
    Ok(folders.iter().find(|f| f.name == name).map(|f| f.to_ref()))
}

async fn make_folder<F, R, C>(
    engine: &SyncEngine<'_, F, R, C>,
    batch: &BatchContext,
    action: &Action,
) -> SyncResult<Outcome>
where
    F: FileStore,
    R: RecordStore,
    C: Codec,
{
    let parent = if action.depth <= 1 {
        None
    } else if let Some(folder) = &action.folder {
        Some(folder.clone())
    } else {
        let parent_dir = parent_path(&action.path);
        let found = resolve_folder_at(engine, batch, parent_dir).await?;
        Some(found.ok_or_else(|| SyncError::UnresolvedParent(action.path.clone()))?)
    };

    let folder = engine
        .records
        .create_folder(&action.name, parent.as_ref().map(|p| p.id.as_str()), &engine.kind)
        .await?;
    info!(path = %action.path, folder = %folder.id, "created folder");
    batch.remember(&action.path, folder.to_ref());
    Ok(Outcome::Applied)
}

async fn make_directory<F, R, C>(
    engine: &SyncEngine<'_, F, R, C>,
    action: &Action,
) -> SyncResult<Outcome>
where
    F: FileStore,
    R: RecordStore,
    C: Codec,
{
    let path = store_path(&engine.base, &action.path);
    match engine.files.create_directory(&path).await? {
        DirCreate::Created => {
            info!(%path, "created directory");
            Ok(Outcome::Applied)
        }
        DirCreate::AlreadyExists => {
            debug!(%path, "directory already exists");
            Ok(Outcome::Unchanged)
        }
    }
}

fn leaf_of(action: &Action) -> SyncResult<&UnifiedLeaf> {
    action
        .leaf
        .as_ref()
        .ok_or_else(|| SyncError::Store(format!("{} action without a document", action.kind)))
}

async fn export_leaf<F, R, C>(
    engine: &SyncEngine<'_, F, R, C>,
    action: &Action,
) -> SyncResult<Outcome>
where
    F: FileStore,
    R: RecordStore,
    C: Codec,
{
    let leaf = leaf_of(action)?;
    let record = leaf
        .record
        .as_ref()
        .ok_or_else(|| SyncError::Store(format!("nothing to export for {}", leaf.name)))?;

    let file_name = match &leaf.file_name {
        Some(existing) => existing.clone(),
        None if is_valid_file_name(&record.name) => generate_file_name(&record.name, &record.id),
        None => return Err(SyncError::InvalidFileName(record.name.clone())),
    };

    let body = if is_structured_content(&record.content) {
        record.content.clone()
    } else {
        engine.codec.to_portable(&record.content)
    };

    let dir = store_path(&engine.base, &action.path);
    engine.files.upload(&dir, &file_name, body.as_bytes()).await?;

    // Stamp after the write so the new file is never newer than the record.
    engine
        .records
        .set_flag(&record.id, FLAG_NAMESPACE, FLAG_EXPORT_DIRTY, Value::Bool(false))
        .await?;
    engine
        .records
        .set_flag(&record.id, FLAG_NAMESPACE, FLAG_LAST_MODIFIED, Value::from(now_ms()))
        .await?;

    info!(file = %join_path(&dir, &file_name), record = %record.id, "exported");
    Ok(Outcome::Applied)
}

async fn import_leaf<F, R, C>(
    engine: &SyncEngine<'_, F, R, C>,
    batch: &BatchContext,
    action: &Action,
) -> SyncResult<Outcome>
where
    F: FileStore,
    R: RecordStore,
    C: Codec,
{
    let leaf = leaf_of(action)?;
    let file_name = leaf
        .file_name
        .as_deref()
        .ok_or_else(|| SyncError::Store(format!("nothing to import for {}", leaf.name)))?;

    let file = join_path(&store_path(&engine.base, &action.path), file_name);
    let text = engine.files.fetch_text(&file).await?;
    let content = if is_structured_content(&text) {
        text
    } else {
        engine.codec.from_portable(&text)
    };

    if let Some(record) = &leaf.record {
        engine.records.update_record_content(&record.id, &content).await?;
        engine
            .records
            .set_flag(&record.id, FLAG_NAMESPACE, FLAG_EXPORT_DIRTY, Value::Bool(false))
            .await?;
        engine
            .records
            .set_flag(&record.id, FLAG_NAMESPACE, FLAG_LAST_MODIFIED, Value::from(now_ms()))
            .await?;
        info!(%file, record = %record.id, "imported into existing record");
        return Ok(Outcome::Applied);
    }

    let folder_id = match &action.folder {
        Some(folder) => Some(folder.id.clone()),
        None if action.depth == 0 => None,
        None => {
            let found = resolve_folder_at(engine, batch, &action.path).await?;
            Some(found.ok_or_else(|| SyncError::UnresolvedParent(action.path.clone()))?.id)
        }
    };

    let created = engine
        .records
        .create_record(NewRecord {
            name: leaf.name.clone(),
            content,
            folder_id,
            export_dirty: false,
            last_modified_ms: now_ms(),
        })
        .await?;
    info!(%file, record = %created.id, "imported as new record");
    Ok(Outcome::Applied)
}
