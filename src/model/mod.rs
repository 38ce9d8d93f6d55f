//! Data models for journal-sync.
//!
//! This module contains the tree shapes the engine works with:
//! - Disk side: `DiskNode`, `DiskFile`
//! - Record side: `Folder`, `Record`, `RecordNode`
//! - Merged view: `UnifiedNode`, `UnifiedLeaf`
//! - Planner output: `Action`, `ActionKind`

pub mod action;
pub mod disk;
pub mod record;
pub mod unified;

pub use action::{Action, ActionKind};
pub use disk::{DiskFile, DiskNode};
pub use record::{
    FLAG_EXPORT_DIRTY, FLAG_LAST_MODIFIED, FLAG_NAMESPACE, Folder, FolderRef, JOURNAL_KIND,
    NewRecord, Record, RecordNode,
};
pub use unified::{LeafStatus, UnifiedLeaf, UnifiedNode};
