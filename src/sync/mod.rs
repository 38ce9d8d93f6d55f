//! Bidirectional sync between a Markdown tree and journal records.
//!
//! A sync pass runs in four stages:
//!
//! 1. **Scan**: the disk side is walked through a [`FileStore`](crate::store::FileStore)
//!    (with per-directory timestamp ledgers as a fallback), the record side is
//!    assembled from folders through a [`RecordStore`](crate::store::RecordStore)
//! 2. **Merge**: both trees are aligned by name and each document is
//!    classified as export, import, conflict, or in sync
//! 3. **Plan**: the unified tree is flattened into an ordered action list
//! 4. **Execute**: actions run grouped by kind and depth; failures are
//!    counted and logged, never fatal to the batch
//!
//! # Change detection
//!
//! Records carry an `ExportDirty` flag and a `LastModified` stamp under the
//! `journal-sync` flag namespace. User edits set both; sync writes clear the
//! flag and restamp, so a completed pass plans nothing on the next run.
//!
//! # Example
//!
//! ```ignore
//! use jsync::store::{IdentityCodec, LocalFileStore, SqliteRecordStore};
//! use jsync::sync::{SyncDirection, SyncEngine};
//!
//! let engine = SyncEngine::new(&files, &records, &IdentityCodec, &settings);
//! engine.prepare().await;
//! let summary = engine.sync(SyncDirection::Both).await?;
//! ```

mod content;
mod engine;
mod execute;
mod filename;
mod ledger;
mod merge;
mod plan;
mod scan_disk;
mod scan_records;
mod status;
mod types;

pub use content::is_structured_content;
pub use engine::{SyncEngine, SyncPlan, prepare_root};
pub use execute::run_batch;
pub use filename::{MARKDOWN_EXT, generate_file_name, is_valid_file_name, parse_file_name};
pub use ledger::{LEDGER_MARKER, Ledger, LedgerEntry};
pub use merge::merge;
pub use plan::{apply_skip_rules, count_by_kind, plan_actions};
pub use scan_disk::scan_disk;
pub use scan_records::{build_record_tree, scan_records};
pub use status::{TreeLine, print_actions, print_summary, print_tree, tree_lines};
pub use types::{DirCreate, SyncDirection, SyncError, SyncResult, SyncSummary};
