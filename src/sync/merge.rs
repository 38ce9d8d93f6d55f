//! Tree merge engine.
//!
//! Aligns the disk tree and the record tree level by level, by exact name,
//! and classifies every resulting document.

use tracing::warn;

use crate::model::{DiskFile, DiskNode, Record, RecordNode, UnifiedLeaf, UnifiedNode};
use crate::sync::{SyncError, SyncResult};

/// Merge a disk node and a record node into one unified node.
///
/// A missing side is replaced by an empty stand-in named after the present
/// side. Output keeps disk order first, then leftover record entries in
/// record order.
///
/// # Errors
///
/// Returns `StructuralMismatch` if both sides are named and the names differ.
pub fn merge(disk: Option<DiskNode>, records: Option<RecordNode>) -> SyncResult<UnifiedNode> {
    let (disk, records) = match (disk, records) {
        (Some(d), Some(r)) => (d, r),
        (Some(d), None) => {
            let r = RecordNode::empty(d.display_name.clone());
            (d, r)
        }
        (None, Some(r)) => (DiskNode::absent(r.display_name.clone()), r),
        (None, None) => (DiskNode::absent(""), RecordNode::empty("")),
    };

    if !disk.display_name.is_empty()
        && !records.display_name.is_empty()
        && disk.display_name != records.display_name
    {
        return Err(SyncError::StructuralMismatch {
            disk: disk.display_name,
            records: records.display_name,
        });
    }

    let display_name = if disk.display_name.is_empty() {
        records.display_name
    } else {
        disk.display_name
    };

    let mut remaining = records.records;
    let mut files = Vec::with_capacity(disk.files.len() + remaining.len());
    for file in disk.files {
        match remaining.iter().position(|r| r.name == file.derived_name) {
            Some(pos) => files.push(paired_leaf(file, remaining.remove(pos))),
            None => files.push(disk_only_leaf(file)),
        }
    }
    files.extend(remaining.into_iter().map(record_only_leaf));

    let mut remaining_dirs = records.children;
    let mut subdirs = Vec::with_capacity(disk.children.len() + remaining_dirs.len());
    for child in disk.children {
        let matched = remaining_dirs
            .iter()
            .position(|r| r.display_name == child.display_name)
            .map(|pos| remaining_dirs.remove(pos));
        subdirs.push(merge(Some(child), matched)?);
    }
    for rest in remaining_dirs {
        subdirs.push(merge(None, Some(rest))?);
    }

    Ok(UnifiedNode {
        display_name,
        on_disk: disk.on_disk,
        folder: records.folder,
        files,
        subdirs,
    })
}

/// Classify a disk file and a record that share a name.
fn paired_leaf(file: DiskFile, record: Record) -> UnifiedLeaf {
    let record_timestamp = record.last_modified_secs();
    let export_dirty = record.export_dirty();
    let disk_newer = match record_timestamp {
        None => true,
        Some(rec) => file.timestamp_secs.is_some_and(|disk| disk > rec),
    };

    let id_mismatch = file
        .derived_id
        .as_deref()
        .is_some_and(|derived| derived != record.id);
    if id_mismatch {
        warn!(
            file = %file.file_name,
            file_id = file.derived_id.as_deref().unwrap_or_default(),
            record_id = %record.id,
            "file name id does not match record; using record id"
        );
    }

    UnifiedLeaf {
        name: record.name.clone(),
        file_name: Some(file.file_name),
        disk_timestamp: file.timestamp_secs,
        record_timestamp,
        on_disk: true,
        id: Some(record.id.clone()),
        record: Some(record),
        save_needed: export_dirty,
        import_needed: disk_newer,
        merge_conflict: export_dirty && disk_newer,
        id_mismatch,
    }
}

fn disk_only_leaf(file: DiskFile) -> UnifiedLeaf {
    UnifiedLeaf {
        name: file.derived_name,
        file_name: Some(file.file_name),
        disk_timestamp: file.timestamp_secs,
        record_timestamp: None,
        on_disk: true,
        id: file.derived_id,
        record: None,
        save_needed: false,
        import_needed: true,
        merge_conflict: false,
        id_mismatch: false,
    }
}

fn record_only_leaf(record: Record) -> UnifiedLeaf {
    UnifiedLeaf {
        name: record.name.clone(),
        file_name: None,
        disk_timestamp: None,
        record_timestamp: record.last_modified_secs(),
        on_disk: false,
        id: Some(record.id.clone()),
        record: Some(record),
        save_needed: true,
        import_needed: false,
        merge_conflict: false,
        id_mismatch: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FLAG_EXPORT_DIRTY, FLAG_LAST_MODIFIED, FLAG_NAMESPACE, FolderRef};
    use serde_json::{Map, Value};

    fn disk_file(file_name: &str, ts: Option<i64>) -> DiskFile {
        let (derived_name, derived_id) = crate::sync::filename::parse_file_name(file_name);
        DiskFile {
            file_name: file_name.to_string(),
            derived_id,
            derived_name,
            timestamp_secs: ts,
            on_disk: true,
        }
    }

    fn record(id: &str, name: &str, dirty: Option<bool>, modified_ms: Option<i64>) -> Record {
        let mut r = Record {
            id: id.to_string(),
            name: name.to_string(),
            content: "text".to_string(),
            folder_id: None,
            flags: Map::new(),
        };
        if let Some(dirty) = dirty {
            r.set_flag(FLAG_NAMESPACE, FLAG_EXPORT_DIRTY, Value::Bool(dirty));
        }
        if let Some(ms) = modified_ms {
            r.set_flag(FLAG_NAMESPACE, FLAG_LAST_MODIFIED, Value::from(ms));
        }
        r
    }

    fn disk(name: &str, files: Vec<DiskFile>, children: Vec<DiskNode>) -> DiskNode {
        DiskNode {
            display_name: name.to_string(),
            on_disk: true,
            files,
            children,
        }
    }

    fn folder_node(name: &str, records: Vec<Record>, children: Vec<RecordNode>) -> RecordNode {
        RecordNode {
            display_name: name.to_string(),
            folder: Some(FolderRef {
                id: format!("f-{name}"),
                name: name.to_string(),
            }),
            children,
            records,
        }
    }

    fn root_node(name: &str, records: Vec<Record>, children: Vec<RecordNode>) -> RecordNode {
        RecordNode {
            display_name: name.to_string(),
            folder: None,
            children,
            records,
        }
    }

    #[test]
    fn test_name_alignment_with_matching_id() {
        let d = disk("world", vec![disk_file("Notes (42).md", Some(10))], vec![]);
        let r = root_node("world", vec![record("42", "Notes", Some(false), Some(20_000))], vec![]);

        let tree = merge(Some(d), Some(r)).unwrap();
        assert_eq!(tree.files.len(), 1);
        let leaf = &tree.files[0];
        assert_eq!(leaf.name, "Notes");
        assert_eq!(leaf.id.as_deref(), Some("42"));
        assert!(!leaf.id_mismatch);
        assert!(!leaf.save_needed);
        assert!(!leaf.import_needed);
    }

    #[test]
    fn test_id_mismatch_still_pairs() {
        let d = disk("world", vec![disk_file("Notes (99).md", Some(10))], vec![]);
        let r = root_node("world", vec![record("42", "Notes", Some(false), Some(20_000))], vec![]);

        let tree = merge(Some(d), Some(r)).unwrap();
        assert_eq!(tree.files.len(), 1);
        assert_eq!(tree.files[0].id.as_deref(), Some("42"));
        assert!(tree.files[0].id_mismatch);
        assert!(!tree.files[0].merge_conflict);
    }

    #[test]
    fn test_disk_only_and_record_only_classification() {
        let d = disk("world", vec![disk_file("Lonely.md", None)], vec![]);
        let r = root_node("world", vec![record("r1", "Fresh", None, None)], vec![]);

        let tree = merge(Some(d), Some(r)).unwrap();
        let disk_only = tree.leaf("Lonely").unwrap();
        assert!(disk_only.import_needed && !disk_only.save_needed && !disk_only.merge_conflict);
        assert!(!disk_only.has_record());

        let record_only = tree.leaf("Fresh").unwrap();
        assert!(record_only.save_needed && !record_only.import_needed && !record_only.merge_conflict);
        assert!(!record_only.on_disk);
    }

    #[test]
    fn test_missing_last_modified_means_disk_wins() {
        let d = disk("world", vec![disk_file("A.md", None)], vec![]);
        let r = root_node("world", vec![record("a", "A", Some(false), None)], vec![]);
        let tree = merge(Some(d), Some(r)).unwrap();
        assert!(tree.files[0].import_needed);
    }

    #[test]
    fn test_equal_timestamps_are_in_sync() {
        let d = disk("world", vec![disk_file("A.md", Some(3000))], vec![]);
        let r = root_node("world", vec![record("a", "A", Some(false), Some(3_000_999))], vec![]);
        let tree = merge(Some(d), Some(r)).unwrap();
        assert!(!tree.files[0].import_needed);
        assert_eq!(tree.files[0].record_timestamp, Some(3000));
    }

    #[test]
    fn test_each_record_matches_once() {
        let d = disk(
            "world",
            vec![disk_file("Dup.md", Some(1)), disk_file("Dup (x).md", Some(1))],
            vec![],
        );
        let r = root_node("world", vec![record("a", "Dup", Some(false), Some(5_000))], vec![]);
        let tree = merge(Some(d), Some(r)).unwrap();
        assert_eq!(tree.files.len(), 2);
        assert!(tree.files[0].has_record());
        assert!(!tree.files[1].has_record());
    }

    #[test]
    fn test_subdirectory_alignment_and_order() {
        let d = disk(
            "world",
            vec![],
            vec![disk("Places", vec![disk_file("Harbor.md", Some(1))], vec![])],
        );
        let r = root_node(
            "world",
            vec![],
            vec![
                folder_node("People", vec![record("p", "Ann", None, None)], vec![]),
                folder_node("Places", vec![], vec![]),
            ],
        );

        let tree = merge(Some(d), Some(r)).unwrap();
        let names: Vec<_> = tree.subdirs.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(names, vec!["Places", "People"]);

        let places = &tree.subdirs[0];
        assert!(places.on_disk);
        assert_eq!(places.folder.as_ref().unwrap().id, "f-Places");

        let people = &tree.subdirs[1];
        assert!(!people.on_disk);
        assert_eq!(people.files[0].name, "Ann");
    }

    #[test]
    fn test_merge_is_total() {
        let d = disk(
            "world",
            vec![disk_file("A.md", Some(1)), disk_file("B (b).md", Some(1))],
            vec![disk("Sub", vec![disk_file("C.md", None)], vec![])],
        );
        let r = root_node(
            "world",
            vec![record("b", "B", Some(true), Some(0)), record("d", "D", None, None)],
            vec![folder_node("Other", vec![record("e", "E", None, None)], vec![])],
        );
        let tree = merge(Some(d), Some(r)).unwrap();
        assert_eq!(tree.leaf_count(), 5);
        for leaf in tree.leaves() {
            assert!(leaf.on_disk || leaf.has_record());
            if leaf.merge_conflict {
                assert!(leaf.save_needed && leaf.import_needed);
            }
        }

        let only_records = merge(None, Some(root_node("world", vec![record("x", "X", None, None)], vec![]))).unwrap();
        assert_eq!(only_records.display_name, "world");
        assert!(!only_records.on_disk);
        assert_eq!(only_records.leaf_count(), 1);

        let nothing = merge(None, None).unwrap();
        assert_eq!(nothing.leaf_count(), 0);
    }

    #[test]
    fn test_structural_mismatch() {
        let d = disk("world", vec![], vec![]);
        let r = root_node("other", vec![], vec![]);
        let err = merge(Some(d), Some(r)).unwrap_err();
        assert!(matches!(
            err,
            SyncError::StructuralMismatch { ref disk, ref records } if disk == "world" && records == "other"
        ));
    }
}
