//! History segments: one path's uninterrupted existence interval.

use serde::{Deserialize, Serialize};

use crate::errors::HistoryError;
use crate::log::NodeKind;
use crate::revision::{Revision, HEAD};

/// Stable handle into a [`History`](crate::History) node arena.
///
/// Segments cross-link each other (`before`/`later`/copy source), which can
/// form shapes with no single owner; referencing by arena index keeps the
/// graph plain data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

/// Copy provenance edge: the segment this one was copied from, pinned to the
/// revision of the source that was copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyFrom {
    pub node: NodeId,
    pub revision: Revision,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One contiguous existence interval of a single path.
///
/// The interval is `[rev_min, rev_max]`; `rev_max == HEAD` means the segment
/// is still alive. Changes applied while alive are stored as revision numbers
/// and resolved through the owning history. Adjacent segments at the same
/// path are linked through `before` (older) and `later` (newer); the chain is
/// strictly non-overlapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    path: String,
    rev_min: Revision,
    rev_max: Revision,
    changes: Vec<Revision>,
    before: Option<NodeId>,
    later: Option<NodeId>,
    copy_from: Option<CopyFrom>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        kind: NodeKind,
        path: String,
        rev_min: Revision,
        rev_max: Revision,
    ) -> Self {
        Self {
            id,
            kind,
            path,
            rev_min,
            rev_max,
            changes: Vec::new(),
            before: None,
            later: None,
            copy_from: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn rev_min(&self) -> Revision {
        self.rev_min
    }

    pub fn rev_max(&self) -> Revision {
        self.rev_max
    }

    /// Revisions of the changes applied directly to this segment, in replay
    /// order. Copy ancestry is not included; see
    /// [`History::changes_up_to`](crate::History::changes_up_to).
    pub fn changes(&self) -> &[Revision] {
        &self.changes
    }

    /// The chronologically previous segment at the same path.
    pub fn before(&self) -> Option<NodeId> {
        self.before
    }

    /// The chronologically next segment at the same path.
    pub fn later(&self) -> Option<NodeId> {
        self.later
    }

    pub fn copy_from(&self) -> Option<CopyFrom> {
        self.copy_from
    }

    /// Whether the segment still exists at the newest revision.
    pub fn is_alive(&self) -> bool {
        self.rev_max == HEAD
    }

    /// Whether the interval contains `revision`.
    pub fn covers(&self, revision: Revision) -> bool {
        self.rev_min <= revision && revision <= self.rev_max
    }

    /// Whether the interval intersects `[rev_min, rev_max]`.
    pub fn overlaps(&self, rev_min: Revision, rev_max: Revision) -> bool {
        self.rev_min <= rev_max && rev_min <= self.rev_max
    }

    // ---- construction-time mutation (History only) ----

    /// Record a change against this still-alive segment.
    pub(crate) fn modify(&mut self, revision: Revision) -> Result<(), HistoryError> {
        self.ensure_alive(revision)?;
        self.changes.push(revision);
        Ok(())
    }

    /// Close the segment: the path stops existing at `revision`. The deleting
    /// change itself is recorded as the last change that touched the path.
    pub(crate) fn delete(&mut self, revision: Revision) -> Result<(), HistoryError> {
        self.ensure_alive(revision)?;
        self.rev_max = revision - 1;
        self.changes.push(revision);
        Ok(())
    }

    pub(crate) fn set_copy_from(&mut self, copy_from: CopyFrom) {
        self.copy_from = Some(copy_from);
    }

    pub(crate) fn set_before(&mut self, before: Option<NodeId>) {
        self.before = before;
    }

    pub(crate) fn set_later(&mut self, later: Option<NodeId>) {
        self.later = later;
    }

    pub(crate) fn set_rev_max(&mut self, rev_max: Revision) {
        self.rev_max = rev_max;
    }

    fn ensure_alive(&self, revision: Revision) -> Result<(), HistoryError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(HistoryError::SegmentClosed {
                path: self.path.clone(),
                revision,
                rev_max: self.rev_max,
            })
        }
    }
}
