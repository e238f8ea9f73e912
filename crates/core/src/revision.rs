//! Revision numbering and the sentinel values used by history segments.

/// Repository revision number.
pub type Revision = i64;

/// Upper-bound sentinel: the segment is still alive at the newest revision.
pub const HEAD: Revision = Revision::MAX;

/// Lower-bound sentinel: the segment is assumed to have existed since before
/// the captured log window (phantom history).
pub const SINCE_EVER: Revision = Revision::MIN;

/// The true first revision of a repository. A capture window starting at or
/// below this value is complete and permits no phantom synthesis.
pub const FIRST_REVISION: Revision = 1;

/// Renders a revision for diagnostics, mapping the sentinels to readable
/// names instead of raw integer extremes.
pub fn display_rev(rev: Revision) -> String {
    match rev {
        HEAD => "HEAD".to_string(),
        SINCE_EVER => "since-ever".to_string(),
        n => format!("r{}", n),
    }
}
