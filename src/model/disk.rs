//! On-disk side of the sync tree.

use serde::Serialize;

/// A directory on the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskNode {
    /// Final path segment of the directory.
    pub display_name: String,
    /// False only for stand-ins synthesized during merge.
    pub on_disk: bool,
    /// Markdown files directly inside this directory, in listing order.
    pub files: Vec<DiskFile>,
    /// Subdirectories, in listing order.
    pub children: Vec<DiskNode>,
}

impl DiskNode {
    /// An empty directory that does not exist yet.
    #[must_use]
    pub fn absent(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            on_disk: false,
            files: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Total number of files in this subtree.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len() + self.children.iter().map(Self::file_count).sum::<usize>()
    }
}

/// A Markdown file found on the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskFile {
    /// File name relative to its directory (e.g. `Notes (42).md`).
    pub file_name: String,
    /// Id parsed from a `"<name> (<id>).md"` file name.
    pub derived_id: Option<String>,
    /// Document name with any id suffix and extension removed.
    pub derived_name: String,
    /// Last-known modification time in whole seconds.
    pub timestamp_secs: Option<i64>,
    pub on_disk: bool,
}
