//! Sync command implementations: tree, plan, and sync.
//!
//! All three scan both sides fresh. `tree` and `plan` never write; `sync`
//! prepares the directories above the synced tree and executes the plan.

use serde::Serialize;

use crate::cli::TreeArgs;
use crate::error::Result;
use crate::model::Action;
use crate::store::{IdentityCodec, LocalFileStore, SqliteRecordStore};
use crate::sync::{
    SyncDirection, SyncEngine, SyncSummary, TreeLine, count_by_kind, print_actions,
    print_summary, print_tree, tree_lines,
};
use std::path::PathBuf;

#[derive(Serialize)]
struct TreeOutput {
    root: String,
    lines: Vec<TreeLine>,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    root: String,
    actions: &'a [Action],
    counts: Vec<(String, usize)>,
    skipped: usize,
}

#[derive(Serialize)]
struct SyncOutput {
    root: String,
    direction: SyncDirection,
    summary: SyncSummary,
}

/// Print the merged tree.
///
/// # Errors
///
/// Returns an error if the database is missing or either side cannot be scanned.
pub fn tree(db_path: Option<&PathBuf>, args: &TreeArgs, json: bool) -> Result<()> {
    let settings = args.settings()?;
    let records = SqliteRecordStore::new(super::open_storage(db_path)?);
    let files = LocalFileStore::new(settings.data_dir.clone());
    let engine = SyncEngine::new(&files, &records, &IdentityCodec, &settings);

    let tree = super::runtime()?.block_on(engine.compute_tree())?;

    if json {
        let output = TreeOutput {
            root: engine.root().to_string(),
            lines: tree_lines(&tree),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_tree(&tree);
    }
    Ok(())
}

/// Print the action list a sync would execute.
///
/// # Errors
///
/// Returns an error if the database is missing or either side cannot be scanned.
pub fn plan(db_path: Option<&PathBuf>, args: &TreeArgs, json: bool) -> Result<()> {
    plan_for(db_path, args, SyncDirection::Both, json)
}

fn plan_for(
    db_path: Option<&PathBuf>,
    args: &TreeArgs,
    direction: SyncDirection,
    json: bool,
) -> Result<()> {
    let settings = args.settings()?;
    let records = SqliteRecordStore::new(super::open_storage(db_path)?);
    let files = LocalFileStore::new(settings.data_dir.clone());
    let engine = SyncEngine::new(&files, &records, &IdentityCodec, &settings);

    let plan = super::runtime()?.block_on(engine.plan())?;
    let actions: Vec<Action> = plan
        .actions
        .into_iter()
        .filter(|a| direction.includes(a.kind))
        .collect();

    if json {
        let output = PlanOutput {
            root: engine.root().to_string(),
            actions: &actions,
            counts: count_by_kind(&actions)
                .into_iter()
                .map(|(kind, n)| (kind.to_string(), n))
                .collect(),
            skipped: plan.skipped,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_actions(&actions, plan.skipped);
    }
    Ok(())
}

/// Run one sync pass, or show its plan when `dry_run` is set.
///
/// # Errors
///
/// Returns an error if the database is missing or either side cannot be scanned.
/// Failures of individual actions are reported in the summary instead.
pub fn sync(
    db_path: Option<&PathBuf>,
    args: &TreeArgs,
    direction: SyncDirection,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    if dry_run {
        return plan_for(db_path, args, direction, json);
    }

    let settings = args.settings()?;
    let records = SqliteRecordStore::new(super::open_storage(db_path)?);
    std::fs::create_dir_all(&settings.data_dir)?;
    let files = LocalFileStore::new(settings.data_dir.clone());
    let engine = SyncEngine::new(&files, &records, &IdentityCodec, &settings);

    let summary = super::runtime()?.block_on(async {
        engine.prepare().await;
        engine.sync(direction).await
    })?;

    if json {
        let output = SyncOutput {
            root: engine.root().to_string(),
            direction,
            summary,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}
