//! Record tree scanner.

use std::collections::HashMap;

use tracing::debug;

use super::content::is_structured_content;
use crate::model::{Folder, Record, RecordNode};
use crate::store::RecordStore;
use crate::sync::SyncResult;

/// Build the record tree for folders and records of `kind`.
///
/// The root node is named `root_name` so that it aligns with the disk root.
///
/// # Errors
///
/// Returns the store error if folders or top-level records cannot be listed.
pub async fn scan_records<R: RecordStore>(
    store: &R,
    kind: &str,
    root_name: &str,
) -> SyncResult<RecordNode> {
    let folders = store.list_folders(kind).await?;
    let top_level = store.list_top_level_records(kind).await?;
    let tree = build_record_tree(root_name, folders, top_level);
    debug!(kind, records = tree.record_count(), "scanned record tree");
    Ok(tree)
}

/// Link folders into a tree under a synthetic root.
///
/// Hidden folders, and folders whose parent is hidden or unknown, are left
/// out along with their records. Structured-content records are dropped.
#[must_use]
pub fn build_record_tree(
    root_name: &str,
    folders: Vec<Folder>,
    top_level: Vec<Record>,
) -> RecordNode {
    let mut nodes: HashMap<String, RecordNode> = HashMap::new();
    let mut children_of: HashMap<Option<String>, Vec<String>> = HashMap::new();

    for folder in folders.into_iter().filter(|f| f.displayed) {
        let folder_ref = folder.to_ref();
        let node = RecordNode {
            display_name: folder.name,
            folder: Some(folder_ref),
            children: Vec::new(),
            records: prose_only(folder.records),
        };
        children_of
            .entry(folder.parent_id)
            .or_default()
            .push(folder.id.clone());
        nodes.insert(folder.id, node);
    }

    let mut root = RecordNode::empty(root_name);
    root.records = prose_only(top_level);
    root.children = attach_children(None, &mut nodes, &children_of);

    for (id, node) in &nodes {
        debug!(folder = %id, name = %node.display_name, "folder has no visible parent; skipped");
    }
    root
}

fn attach_children(
    parent: Option<String>,
    nodes: &mut HashMap<String, RecordNode>,
    children_of: &HashMap<Option<String>, Vec<String>>,
) -> Vec<RecordNode> {
    let Some(ids) = children_of.get(&parent) else {
        return Vec::new();
    };
    ids.iter()
        .filter_map(|id| {
            let mut node = nodes.remove(id)?;
            node.children = attach_children(Some(id.clone()), nodes, children_of);
            Some(node)
        })
        .collect()
}

fn prose_only(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| {
            let structured = is_structured_content(&r.content);
            if structured {
                debug!(record = %r.id, "structured content; excluded from sync");
            }
            !structured
        })
        .collect()
}
