//! Log-entry model types: the input interface for history construction.
//!
//! A log reader (such as the `cherryport` binary's `svn log --xml` parser)
//! produces these; [`HistoryBuilder`](crate::HistoryBuilder) consumes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::revision::Revision;

// ---------------------------------------------------------------------------
// Node kind
// ---------------------------------------------------------------------------

/// Filesystem kind of a changed path.
///
/// Logs frequently omit the kind attribute, so `Unknown` is a first-class
/// value that matches either concrete kind during lookups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Dir,
    Unknown,
}

impl NodeKind {
    /// Parse a kind string as found in log output.
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "file" => Self::File,
            "dir" => Self::Dir,
            _ => Self::Unknown,
        }
    }

    /// Whether two kinds are compatible. `Unknown` matches anything.
    pub fn matches(self, other: NodeKind) -> bool {
        self == NodeKind::Unknown || other == NodeKind::Unknown || self == other
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Dir => write!(f, "dir"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Change action
// ---------------------------------------------------------------------------

/// What a log entry did to one path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Added,
    Deleted,
    Modified,
    /// Delete and re-create of a different entity at the same path, in one
    /// revision.
    Replaced,
}

impl ChangeAction {
    /// Parse a single-letter action code (`A`/`D`/`M`/`R`).
    pub fn from_svn_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Self::Added),
            "D" => Some(Self::Deleted),
            "M" => Some(Self::Modified),
            "R" => Some(Self::Replaced),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Deleted => write!(f, "deleted"),
            Self::Modified => write!(f, "modified"),
            Self::Replaced => write!(f, "replaced"),
        }
    }
}

// ---------------------------------------------------------------------------
// Changed path
// ---------------------------------------------------------------------------

/// One path touched by a log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedPath {
    pub path: String,
    pub action: ChangeAction,
    pub kind: NodeKind,
    pub copy_from_path: Option<String>,
    pub copy_from_revision: Option<Revision>,
}

impl ChangedPath {
    /// Copy provenance, present only when both the source path and source
    /// revision were recorded.
    pub fn copy_from(&self) -> Option<(&str, Revision)> {
        match (&self.copy_from_path, self.copy_from_revision) {
            (Some(path), Some(rev)) => Some((path.as_str(), rev)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// One committed revision with its metadata and touched paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub revision: Revision,
    pub author: String,
    pub date: DateTime<Utc>,
    pub message: String,
    pub changed_paths: Vec<ChangedPath>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_matching() {
        assert!(NodeKind::File.matches(NodeKind::File));
        assert!(NodeKind::Unknown.matches(NodeKind::File));
        assert!(NodeKind::Dir.matches(NodeKind::Unknown));
        assert!(!NodeKind::File.matches(NodeKind::Dir));
    }

    #[test]
    fn test_node_kind_from_str_val() {
        assert_eq!(NodeKind::from_str_val("file"), NodeKind::File);
        assert_eq!(NodeKind::from_str_val("dir"), NodeKind::Dir);
        assert_eq!(NodeKind::from_str_val(""), NodeKind::Unknown);
        assert_eq!(NodeKind::from_str_val("symlink"), NodeKind::Unknown);
    }

    #[test]
    fn test_change_action_from_svn_code() {
        assert_eq!(ChangeAction::from_svn_code("A"), Some(ChangeAction::Added));
        assert_eq!(ChangeAction::from_svn_code("D"), Some(ChangeAction::Deleted));
        assert_eq!(ChangeAction::from_svn_code("M"), Some(ChangeAction::Modified));
        assert_eq!(ChangeAction::from_svn_code("R"), Some(ChangeAction::Replaced));
        assert_eq!(ChangeAction::from_svn_code("X"), None);
    }

    #[test]
    fn test_copy_from_requires_both_fields() {
        let mut cp = ChangedPath {
            path: "/branches/stable".into(),
            action: ChangeAction::Added,
            kind: NodeKind::Dir,
            copy_from_path: Some("/branches/unstable".into()),
            copy_from_revision: Some(69),
        };
        assert_eq!(cp.copy_from(), Some(("/branches/unstable", 69)));

        cp.copy_from_revision = None;
        assert_eq!(cp.copy_from(), None);
    }
}
