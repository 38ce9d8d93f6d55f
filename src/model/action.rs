//! Planned side effects produced by walking the unified tree.

use serde::Serialize;

use super::record::FolderRef;
use super::unified::UnifiedLeaf;

/// Kind of a planned action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a directory on the file store.
    Mkdir,
    /// Create a folder in the record store.
    Mkfolder,
    /// Write a record to disk.
    Export,
    /// Read a disk file into the record store.
    Import,
    /// Both sides changed; left for the operator.
    Conflict,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mkdir => "mkdir",
            Self::Mkfolder => "mkfolder",
            Self::Export => "export",
            Self::Import => "import",
            Self::Conflict => "conflict",
        }
    }

    /// Whether this action targets a single document rather than a directory level.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Export | Self::Import | Self::Conflict)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mkdir" => Ok(Self::Mkdir),
            "mkfolder" => Ok(Self::Mkfolder),
            "export" => Ok(Self::Export),
            "import" => Ok(Self::Import),
            "conflict" => Ok(Self::Conflict),
            _ => Err(format!("Unknown action kind: {s}")),
        }
    }
}

/// A single planned action.
///
/// `path` is the slash-separated directory path from the sync root's parent
/// (e.g. `/world/Places`). For directory actions it names the directory
/// itself; for leaf actions it names the directory containing the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    /// Directory or document name.
    pub name: String,
    pub path: String,
    /// Folder to attach to: the nearest ancestor folder for `mkfolder`,
    /// the containing folder for leaf actions. `None` when it is pending
    /// creation (resolved at execution time) or the level is the root.
    pub folder: Option<FolderRef>,
    /// Tree depth, root = 0.
    pub depth: usize,
    /// The document for leaf actions.
    pub leaf: Option<UnifiedLeaf>,
}

impl Action {
    /// Final segment of the directory this action lives in.
    #[must_use]
    pub fn directory_name(&self) -> &str {
        if self.kind.is_leaf() {
            last_segment(&self.path)
        } else {
            &self.name
        }
    }
}

/// Final non-empty segment of a slash-separated path.
#[must_use]
pub fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit_once('/').map_or(trimmed, |(_, last)| last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrips_through_str() {
        for kind in [
            ActionKind::Mkdir,
            ActionKind::Mkfolder,
            ActionKind::Export,
            ActionKind::Import,
            ActionKind::Conflict,
        ] {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
        assert!("delete".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/world/Places"), "Places");
        assert_eq!(last_segment("/world/Places/"), "Places");
        assert_eq!(last_segment("world"), "world");
        assert_eq!(last_segment(""), "");
        assert_eq!(last_segment("///"), "");
        assert_eq!(last_segment("w/Q%41/"), "Q%41");
    }
}
