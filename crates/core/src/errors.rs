//! Error types for history construction and querying.
//!
//! Every variant is a fatal data-consistency failure: the input log
//! contradicts itself, or a mutation was applied out of protocol. Tolerated
//! gaps in a partial log window never surface here — lookups report those as
//! `None` and synthesis fills them in.

use thiserror::Error;

use crate::revision::{display_rev, Revision};

/// Errors raised while building or querying a [`History`](crate::History).
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A change with this revision was registered twice.
    #[error("change r{0} registered twice")]
    DuplicateRevision(Revision),

    /// The revision was never recorded in this history.
    #[error("no change recorded for r{0}")]
    RevisionNotFound(Revision),

    /// A modify or delete reached a segment that was already closed.
    #[error("segment for '{path}' closed at {} cannot take r{revision}", display_rev(*.rev_max))]
    SegmentClosed {
        path: String,
        revision: Revision,
        rev_max: Revision,
    },

    /// Two segments for the same path claim overlapping revision ranges.
    #[error(
        "segment for '{path}' spanning {}..{} overlaps existing segment {}..{}",
        display_rev(*.rev_min),
        display_rev(*.rev_max),
        display_rev(*.other_min),
        display_rev(*.other_max)
    )]
    SegmentOverlap {
        path: String,
        rev_min: Revision,
        rev_max: Revision,
        other_min: Revision,
        other_max: Revision,
    },

    /// A copy source could not be resolved even though the log window
    /// reaches back to the first revision of the repository.
    #[error("copy source '{path}'@{} not found in a complete log", display_rev(*.revision))]
    CopySourceMissing {
        path: String,
        revision: Revision,
    },
}
