//! Record side of the sync tree: folders and journal records of the host store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flag namespace owned by the sync engine.
pub const FLAG_NAMESPACE: &str = "journal-sync";

/// Set when a record changed since its last export.
pub const FLAG_EXPORT_DIRTY: &str = "ExportDirty";

/// Epoch milliseconds of the last edit or sync of a record.
pub const FLAG_LAST_MODIFIED: &str = "LastModified";

/// Folder kind holding journal records.
pub const JOURNAL_KIND: &str = "JournalEntry";

/// A journal record as exposed by the host store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub content: String,
    /// Containing folder, `None` for top-level records.
    pub folder_id: Option<String>,
    /// Per-namespace flag objects: `{ "<namespace>": { "<key>": value } }`.
    #[serde(default)]
    pub flags: Map<String, Value>,
}

impl Record {
    /// Read a flag value.
    #[must_use]
    pub fn get_flag(&self, namespace: &str, key: &str) -> Option<&Value> {
        self.flags.get(namespace)?.get(key)
    }

    /// Write a flag value in place (the store persists it separately).
    pub fn set_flag(&mut self, namespace: &str, key: &str, value: Value) {
        let entry = self
            .flags
            .entry(namespace.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
    }

    /// Whether the record changed since its last export. Unset means clean.
    #[must_use]
    pub fn export_dirty(&self) -> bool {
        self.get_flag(FLAG_NAMESPACE, FLAG_EXPORT_DIRTY)
            .is_some_and(is_truthy)
    }

    /// Last modification time in epoch milliseconds, if ever recorded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn last_modified_ms(&self) -> Option<i64> {
        let value = self.get_flag(FLAG_NAMESPACE, FLAG_LAST_MODIFIED)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
    }

    /// Last modification time floored to whole seconds.
    #[must_use]
    pub fn last_modified_secs(&self) -> Option<i64> {
        self.last_modified_ms().map(|ms| ms.div_euclid(1000))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A record to be created by the host store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub name: String,
    pub content: String,
    pub folder_id: Option<String>,
    pub export_dirty: bool,
    pub last_modified_ms: i64,
}

/// A host-side folder with its direct records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub kind: String,
    /// Hidden folders are ignored by the record scanner.
    pub displayed: bool,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl Folder {
    #[must_use]
    pub fn to_ref(&self) -> FolderRef {
        FolderRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Lightweight handle to a folder, carried by tree nodes and actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

/// A folder level of the record tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordNode {
    pub display_name: String,
    /// Folder backing this node, `None` for the root.
    pub folder: Option<FolderRef>,
    pub children: Vec<RecordNode>,
    pub records: Vec<Record>,
}

impl RecordNode {
    /// An empty node with no backing folder.
    #[must_use]
    pub fn empty(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            folder: None,
            children: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Total number of records in this subtree.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len() + self.children.iter().map(Self::record_count).sum::<usize>()
    }
}
