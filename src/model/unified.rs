//! Merged view of the disk and record trees.
//!
//! Every directory level pairs an optional disk directory with an optional
//! record folder, and every leaf pairs an optional disk file with an optional
//! record. Leaves carry the sync status computed during merge.

use serde::Serialize;

use super::record::{FolderRef, Record};

/// A directory level of the unified tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedNode {
    pub display_name: String,
    /// Whether the directory exists on the file store.
    pub on_disk: bool,
    /// Folder backing this level, if one exists on the record side.
    pub folder: Option<FolderRef>,
    pub files: Vec<UnifiedLeaf>,
    pub subdirs: Vec<UnifiedNode>,
}

impl UnifiedNode {
    /// Total number of leaves in this subtree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.files.len() + self.subdirs.iter().map(Self::leaf_count).sum::<usize>()
    }

    /// Depth-first iterator over every leaf in this subtree.
    pub fn leaves(&self) -> Box<dyn Iterator<Item = &UnifiedLeaf> + '_> {
        Box::new(
            self.files
                .iter()
                .chain(self.subdirs.iter().flat_map(Self::leaves)),
        )
    }

    /// Find a direct leaf by document name.
    #[must_use]
    pub fn leaf(&self, name: &str) -> Option<&UnifiedLeaf> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// One document: a disk file, a record, or both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedLeaf {
    /// Document name shared by both sides.
    pub name: String,
    /// File name on disk, `None` if the file does not exist yet.
    pub file_name: Option<String>,
    /// Disk timestamp in whole seconds.
    pub disk_timestamp: Option<i64>,
    /// Record last-modified time in whole seconds.
    pub record_timestamp: Option<i64>,
    pub on_disk: bool,
    /// Record id when a record exists, otherwise the id parsed from the file name.
    pub id: Option<String>,
    #[serde(skip)]
    pub record: Option<Record>,
    /// The record must be written to disk.
    pub save_needed: bool,
    /// The disk file must be read into the record store.
    pub import_needed: bool,
    /// Both sides changed independently.
    pub merge_conflict: bool,
    /// The id in the file name disagrees with the matched record's id.
    pub id_mismatch: bool,
}

impl UnifiedLeaf {
    /// Resolved status, with conflict taking precedence over export over import.
    #[must_use]
    pub fn status(&self) -> LeafStatus {
        if self.merge_conflict {
            LeafStatus::Conflict
        } else if self.save_needed {
            LeafStatus::Export
        } else if self.import_needed {
            LeafStatus::Import
        } else {
            LeafStatus::InSync
        }
    }

    #[must_use]
    pub fn has_record(&self) -> bool {
        self.record.is_some()
    }
}

/// Display status of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafStatus {
    Conflict,
    Export,
    Import,
    InSync,
}

impl LeafStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Conflict => "conflict",
            Self::Export => "export",
            Self::Import => "import",
            Self::InSync => "in sync",
        }
    }
}

impl std::fmt::Display for LeafStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
