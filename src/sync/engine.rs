//! Sync orchestration: scan both sides, merge, plan, execute.

use tracing::{debug, info, warn};

use super::execute::run_batch;
use super::merge::merge;
use super::plan::{apply_skip_rules, plan_actions};
use super::scan_disk::scan_disk;
use super::scan_records::scan_records;
use crate::config::{SkipRules, SyncSettings};
use crate::model::{Action, JOURNAL_KIND, UnifiedNode};
use crate::store::{Codec, FileStore, RecordStore};
use crate::sync::{DirCreate, SyncDirection, SyncError, SyncResult, SyncSummary};

/// A computed plan, ready to execute or display.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub tree: UnifiedNode,
    pub actions: Vec<Action>,
    /// Actions dropped by skip rules.
    pub skipped: usize,
}

/// Binds the stores, codec, and settings for one world.
///
/// Nothing is cached between calls: every plan rescans both sides.
pub struct SyncEngine<'a, F, R, C> {
    pub(crate) files: &'a F,
    pub(crate) records: &'a R,
    pub(crate) codec: &'a C,
    root: String,
    pub(crate) base: String,
    root_name: String,
    pub(crate) kind: String,
    skip: SkipRules,
}

impl<'a, F: FileStore, R: RecordStore, C: Codec> SyncEngine<'a, F, R, C> {
    #[must_use]
    pub fn new(files: &'a F, records: &'a R, codec: &'a C, settings: &SyncSettings) -> Self {
        Self {
            files,
            records,
            codec,
            root: settings.sync_root(),
            base: settings.sync_base(),
            root_name: settings.root_name(),
            kind: JOURNAL_KIND.to_string(),
            skip: settings.skip.clone(),
        }
    }

    /// Store-relative path of the synced directory.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Create the directories above the sync root.
    ///
    /// The root itself is left to the plan so a missing root shows up as `mkdir`.
    pub async fn prepare(&self) -> usize {
        prepare_root(self.files, &self.base).await
    }

    /// Scan both sides and merge them.
    ///
    /// A missing sync root is treated as an empty disk side.
    ///
    /// # Errors
    ///
    /// Propagates scan failures other than a missing root, and `StructuralMismatch`.
    pub async fn compute_tree(&self) -> SyncResult<UnifiedNode> {
        let disk = match scan_disk(self.files, &self.root).await {
            Ok(tree) => Some(tree),
            Err(SyncError::NotFound(path)) => {
                info!(root = %self.root, %path, "sync root missing; treating disk side as empty");
                None
            }
            Err(e) => return Err(e),
        };
        let records = scan_records(self.records, &self.kind, &self.root_name).await?;
        merge(disk, Some(records))
    }

    /// Compute the filtered action list.
    ///
    /// # Errors
    ///
    /// See [`Self::compute_tree`].
    pub async fn plan(&self) -> SyncResult<SyncPlan> {
        let tree = self.compute_tree().await?;
        let (actions, skipped) = apply_skip_rules(plan_actions(&tree), &self.skip);
        debug!(actions = actions.len(), skipped, "planned sync");
        Ok(SyncPlan {
            tree,
            actions,
            skipped,
        })
    }

    /// Plan and execute one sync pass.
    ///
    /// Per-action failures are counted in the summary, not returned.
    ///
    /// # Errors
    ///
    /// See [`Self::compute_tree`].
    pub async fn sync(&self, direction: SyncDirection) -> SyncResult<SyncSummary> {
        let plan = self.plan().await?;
        let mut summary = run_batch(self, &plan.actions, direction).await;
        summary.skipped += plan.skipped;
        info!(
            directories = summary.directories,
            folders = summary.folders,
            exported = summary.exported,
            imported = summary.imported,
            conflicts = summary.conflicts,
            skipped = summary.skipped,
            failed = summary.failed,
            "sync finished"
        );
        Ok(summary)
    }
}

/// Create every prefix of `path` (`a/`, `a/b/`, ...) in order.
///
/// "Already exists" counts as success; other failures are logged and the
/// walk continues. Returns the number of directories created.
pub async fn prepare_root<F: FileStore>(files: &F, path: &str) -> usize {
    let mut created = 0;
    let mut prefix = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        prefix.push_str(segment);
        prefix.push('/');
        match files.create_directory(&prefix).await {
            Ok(DirCreate::Created) => {
                debug!(path = %prefix, "created directory");
                created += 1;
            }
            Ok(DirCreate::AlreadyExists) => {}
            Err(e) => warn!(path = %prefix, error = %e, "could not create directory"),
        }
    }
    created
}
