//! Action planner.
//!
//! Walks the unified tree depth-first and emits one action per pending side
//! effect. Output is in pre-order; executors regroup it by kind and depth.

use crate::config::SkipRules;
use crate::model::{Action, ActionKind, FolderRef, LeafStatus, UnifiedNode};

/// Plan every action needed to bring both sides of `root` into agreement.
///
/// Action paths start at the root's name (`/world/...`) and are resolved
/// against the sync root's parent at execution time.
#[must_use]
pub fn plan_actions(root: &UnifiedNode) -> Vec<Action> {
    let mut actions = Vec::new();
    walk(root, "", None, 0, &mut actions);
    actions
}

fn walk(
    node: &UnifiedNode,
    parent_path: &str,
    ancestor: Option<&FolderRef>,
    depth: usize,
    out: &mut Vec<Action>,
) {
    let path = format!("{parent_path}/{}", node.display_name);

    if !node.on_disk {
        out.push(Action {
            kind: ActionKind::Mkdir,
            name: node.display_name.clone(),
            path: path.clone(),
            folder: None,
            depth,
            leaf: None,
        });
    }

    if node.folder.is_none() && depth > 0 {
        out.push(Action {
            kind: ActionKind::Mkfolder,
            name: node.display_name.clone(),
            path: path.clone(),
            folder: ancestor.cloned(),
            depth,
            leaf: None,
        });
    }

    for leaf in &node.files {
        let kind = match leaf.status() {
            LeafStatus::Conflict => ActionKind::Conflict,
            LeafStatus::Export => ActionKind::Export,
            LeafStatus::Import => ActionKind::Import,
            LeafStatus::InSync => continue,
        };
        out.push(Action {
            kind,
            name: leaf.name.clone(),
            path: path.clone(),
            folder: node.folder.clone(),
            depth,
            leaf: Some(leaf.clone()),
        });
    }

    // A child's fallback parent is this level's folder only; when that folder
    // is still pending the executor resolves it by path.
    for sub in &node.subdirs {
        walk(sub, &path, node.folder.as_ref(), depth + 1, out);
    }
}

/// Drop actions excluded by the skip rules. Returns the kept actions and the
/// number dropped.
#[must_use]
pub fn apply_skip_rules(actions: Vec<Action>, rules: &SkipRules) -> (Vec<Action>, usize) {
    if rules.is_empty() {
        return (actions, 0);
    }
    let before = actions.len();
    let kept: Vec<Action> = actions
        .into_iter()
        .filter(|action| {
            if rules.skips_folder(action.directory_name()) {
                return false;
            }
            !(action.kind.is_leaf() && rules.skips_entry(&action.name))
        })
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Count planned actions per kind, in a fixed order.
#[must_use]
pub fn count_by_kind(actions: &[Action]) -> Vec<(ActionKind, usize)> {
    [
        ActionKind::Mkdir,
        ActionKind::Mkfolder,
        ActionKind::Export,
        ActionKind::Import,
        ActionKind::Conflict,
    ]
    .into_iter()
    .map(|kind| (kind, actions.iter().filter(|a| a.kind == kind).count()))
    .collect()
}
