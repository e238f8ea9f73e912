//! The per-repository path-history index.
//!
//! A [`History`] reconstructs the complete lifetime of every path from a raw
//! per-revision change log:
//!
//! 1. [`HistoryBuilder`](builder::HistoryBuilder) replays log entries in
//!    ascending revision order, calling the crate-private mutation operations.
//! 2. Each path accumulates a chain of non-overlapping [`Node`] segments,
//!    newest first, linked through `before`/`later`.
//! 3. Lookups that the log never answered directly are synthesized:
//!    implicit children inherit their parent directory's interval and copy
//!    provenance, and copy sources outside the captured window become
//!    phantom segments assumed to exist since ever.
//! 4. Once built, the history is read-only and can be shared freely.

pub mod builder;
pub mod change;
pub mod node;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::errors::HistoryError;
use crate::log::NodeKind;
use crate::message::MessageConvention;
use crate::revision::{display_rev, Revision, FIRST_REVISION, HEAD, SINCE_EVER};

use change::Change;
use node::{CopyFrom, Node, NodeId};

/// Reconstructed history of one repository (or one captured window of it).
///
/// Owns the change index, the node arena, and the path index pointing at the
/// most recent segment for each path. Mutation is reachable only through
/// [`HistoryBuilder`](builder::HistoryBuilder); every public method is a
/// read.
#[derive(Debug)]
pub struct History {
    start_revision: Revision,
    convention: Arc<dyn MessageConvention>,
    changes: BTreeMap<Revision, Change>,
    nodes: Vec<Node>,
    /// Most recent segment ever created for each path; older segments are
    /// reachable through `before`.
    nodes_by_path: BTreeMap<String, NodeId>,
}

impl History {
    pub(crate) fn new(start_revision: Revision, convention: Arc<dyn MessageConvention>) -> Self {
        Self {
            start_revision,
            convention,
            changes: BTreeMap::new(),
            nodes: Vec::new(),
            nodes_by_path: BTreeMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// Oldest revision for which log data was captured.
    pub fn start_revision(&self) -> Revision {
        self.start_revision
    }

    /// The live segment at `path`, if any. `Unknown` matches either kind.
    pub fn current_node(&self, kind: NodeKind, path: &str) -> Option<&Node> {
        let id = *self.nodes_by_path.get(path)?;
        let node = &self.nodes[id.0];
        if node.is_alive() && kind.matches(node.kind()) {
            Some(node)
        } else {
            None
        }
    }

    /// The change committed as `revision`; fatal if it was never recorded.
    pub fn change(&self, revision: Revision) -> Result<&Change, HistoryError> {
        self.changes
            .get(&revision)
            .ok_or(HistoryError::RevisionNotFound(revision))
    }

    /// All recorded changes, by revision.
    pub fn changes(&self) -> &BTreeMap<Revision, Change> {
        &self.changes
    }

    /// Every segment ever created, live or dead, recorded or synthesized.
    pub fn touched_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// The full ancestry of changes applicable to a segment at `revision`:
    /// the copy source's history up to the copy revision first, then the
    /// segment's own changes up to `revision`.
    ///
    /// The copy is the temporal join point, so copied-in edits come first
    /// even when their raw revision numbers are higher than some of the
    /// segment's own early edits.
    pub fn changes_up_to(&self, id: NodeId, revision: Revision) -> Vec<&Change> {
        let node = &self.nodes[id.0];
        let mut out = Vec::new();
        if let Some(copy) = node.copy_from() {
            out.extend(self.changes_up_to(copy.node, copy.revision));
        }
        out.extend(
            node.changes()
                .iter()
                .filter(|rev| **rev <= revision)
                .filter_map(|rev| self.changes.get(rev)),
        );
        out
    }

    // -----------------------------------------------------------------------
    // Mutation (HistoryBuilder only)
    // -----------------------------------------------------------------------

    pub(crate) fn create_change(
        &mut self,
        revision: Revision,
        author: &str,
        date: chrono::DateTime<chrono::Utc>,
        message: &str,
    ) -> Result<(), HistoryError> {
        if self.changes.contains_key(&revision) {
            return Err(HistoryError::DuplicateRevision(revision));
        }
        let change = Change::new(
            revision,
            author.to_string(),
            date,
            message.to_string(),
            self.convention.as_ref(),
        );
        self.changes.insert(revision, change);
        Ok(())
    }

    /// A path came into existence at `revision`, optionally copied from
    /// another path at an older revision.
    pub(crate) fn added_node(
        &mut self,
        kind: NodeKind,
        path: &str,
        revision: Revision,
        copy: Option<(&str, Revision)>,
    ) -> Result<NodeId, HistoryError> {
        // A still-alive segment at this path means its delete fell outside
        // the captured window; close it with this change before re-creating.
        if let Some(&latest) = self.nodes_by_path.get(path) {
            if self.nodes[latest.0].is_alive() {
                debug!(path, revision, "closing still-alive segment before re-add");
                self.nodes[latest.0].delete(revision)?;
            }
        }

        let id = self.new_node(kind, path, revision, HEAD);
        self.enter_node(id)?;
        self.nodes[id.0].modify(revision)?;

        if let Some((copy_path, copy_revision)) = copy {
            let source = match self.lookup_node(kind, copy_path, copy_revision)? {
                Some(source) => source,
                None if self.start_revision > FIRST_REVISION => {
                    debug!(
                        copy_path,
                        copy_revision,
                        "copy source outside captured window, synthesizing phantom"
                    );
                    self.mk_historic_node(kind, copy_path, SINCE_EVER, HEAD)?
                }
                None => {
                    return Err(HistoryError::CopySourceMissing {
                        path: copy_path.to_string(),
                        revision: copy_revision,
                    })
                }
            };
            self.nodes[id.0].set_copy_from(CopyFrom {
                node: source,
                revision: copy_revision,
            });
        }
        Ok(id)
    }

    /// A path was modified at `revision`.
    pub(crate) fn modified_node(
        &mut self,
        kind: NodeKind,
        path: &str,
        revision: Revision,
    ) -> Result<NodeId, HistoryError> {
        let id = self.mk_current_node(kind, path, revision)?;
        self.nodes[id.0].modify(revision)?;
        Ok(id)
    }

    /// A path stopped existing at `revision`. Deleting a directory also
    /// closes every live descendant, whether or not the log recorded them
    /// individually.
    pub(crate) fn deleted_node(
        &mut self,
        kind: NodeKind,
        path: &str,
        revision: Revision,
    ) -> Result<(), HistoryError> {
        let id = self.mk_current_node(kind, path, revision)?;
        self.nodes[id.0].delete(revision)?;

        let prefix = format!("{}/", path);
        let descendants: Vec<NodeId> = self
            .nodes_by_path
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(prefix.as_str()))
            .map(|(_, &nid)| nid)
            .filter(|nid| self.nodes[nid.0].is_alive())
            .collect();
        if !descendants.is_empty() {
            debug!(path, revision, count = descendants.len(), "cascading delete");
        }
        for nid in descendants {
            self.nodes[nid.0].delete(revision)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookup and synthesis
    // -----------------------------------------------------------------------

    /// Resolve which segment existed at `path` during `revision`, even when
    /// that exact fact was never recorded.
    ///
    /// May synthesize implicit children and extend phantoms, so it is part of
    /// construction, not of the frozen read surface. `Ok(None)` means the
    /// path has no history under this lineage, which callers treat as "no
    /// history available", never as an error.
    pub(crate) fn lookup_node(
        &mut self,
        kind: NodeKind,
        path: &str,
        revision: Revision,
    ) -> Result<Option<NodeId>, HistoryError> {
        // A recorded segment chain answers the query directly when one of
        // its segments covers the revision.
        if let Some(&latest) = self.nodes_by_path.get(path) {
            let mut cursor = Some(latest);
            while let Some(id) = cursor {
                let segment = &self.nodes[id.0];
                if segment.rev_min() <= revision {
                    if revision <= segment.rev_max() {
                        return Ok(Some(id));
                    }
                    break;
                }
                cursor = segment.before();
            }
            // Chain exhausted or a gap: fall through to parent resolution.
        }

        let Some(sep) = path.rfind('/') else {
            return Ok(None);
        };
        let parent_path = &path[..sep];
        if parent_path.is_empty() {
            return Ok(None);
        }
        // The since-ever sentinel must not manufacture infinite history.
        if revision == SINCE_EVER {
            return Ok(None);
        }

        let Some(parent) = self.lookup_node(NodeKind::Dir, parent_path, revision)? else {
            return Ok(None);
        };
        let parent_min = self.nodes[parent.0].rev_min();
        let parent_max = self.nodes[parent.0].rev_max();
        let parent_copy = self.nodes[parent.0].copy_from();

        // An explicit segment overlapping the parent's interval is a
        // different lineage position for the same path; never shadow it with
        // a synthesized duplicate.
        if let Some(&latest) = self.nodes_by_path.get(path) {
            let mut cursor = Some(latest);
            while let Some(id) = cursor {
                if self.nodes[id.0].overlaps(parent_min, parent_max) {
                    return Ok(None);
                }
                cursor = self.nodes[id.0].before();
            }
        }

        // The path is deemed to have existed because its parent directory
        // did, spanning exactly the parent's interval.
        debug!(
            path,
            parent = parent_path,
            rev_min = %display_rev(parent_min),
            rev_max = %display_rev(parent_max),
            "synthesizing implicit segment"
        );
        let id = self.mk_historic_node(kind, path, parent_min, parent_max)?;

        // Copy provenance propagates down into children the log never
        // individually recorded as copied.
        if self.nodes[id.0].copy_from().is_none() {
            if let Some(copy) = parent_copy {
                let source_parent = self.nodes[copy.node.0].path().to_string();
                let source_child = format!("{}{}", source_parent, &path[sep..]);
                if let Some(source) = self.lookup_node(kind, &source_child, copy.revision)? {
                    self.nodes[id.0].set_copy_from(CopyFrom {
                        node: source,
                        revision: copy.revision,
                    });
                }
            }
        }
        Ok(Some(id))
    }

    /// Resolve or create the live segment a modify/delete applies to.
    fn mk_current_node(
        &mut self,
        kind: NodeKind,
        path: &str,
        revision: Revision,
    ) -> Result<NodeId, HistoryError> {
        if let Some(id) = self.lookup_node(kind, path, revision)? {
            if self.nodes[id.0].is_alive() {
                return Ok(id);
            }
        }
        // The add predates the captured window; open a fresh segment at the
        // mutating revision.
        debug!(path, revision, "no live segment, opening fresh segment");
        let id = self.new_node(kind, path, revision, HEAD);
        self.enter_node(id)?;
        Ok(id)
    }

    /// Create (or extend) a synthesized segment spanning `[rev_min, rev_max]`.
    ///
    /// With `rev_min == SINCE_EVER` and a phantom already present at `path`,
    /// the existing phantom's upper bound is extended instead, never past the
    /// next recorded segment.
    fn mk_historic_node(
        &mut self,
        kind: NodeKind,
        path: &str,
        rev_min: Revision,
        mut rev_max: Revision,
    ) -> Result<NodeId, HistoryError> {
        if rev_min == SINCE_EVER {
            if let Some(&latest) = self.nodes_by_path.get(path) {
                let mut oldest = latest;
                while let Some(before) = self.nodes[oldest.0].before() {
                    oldest = before;
                }
                if self.nodes[oldest.0].rev_min() == SINCE_EVER {
                    let bound = match self.nodes[oldest.0].later() {
                        Some(later) => rev_max.min(self.nodes[later.0].rev_min() - 1),
                        None => rev_max,
                    };
                    if bound > self.nodes[oldest.0].rev_max() {
                        debug!(path, rev_max = %display_rev(bound), "extending phantom segment");
                        self.nodes[oldest.0].set_rev_max(bound);
                    }
                    return Ok(oldest);
                }
                // The phantom slots in below the oldest recorded segment.
                rev_max = rev_max.min(self.nodes[oldest.0].rev_min() - 1);
            }
        }
        let id = self.new_node(kind, path, rev_min, rev_max);
        self.enter_node(id)?;
        Ok(id)
    }

    fn new_node(
        &mut self,
        kind: NodeKind,
        path: &str,
        rev_min: Revision,
        rev_max: Revision,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::new(id, kind, path.to_string(), rev_min, rev_max));
        id
    }

    /// Link a freshly created segment into its path's chain, keeping the
    /// chain in strictly decreasing `rev_min` order and non-overlapping.
    fn enter_node(&mut self, id: NodeId) -> Result<(), HistoryError> {
        let path = self.nodes[id.0].path().to_string();
        let rev_min = self.nodes[id.0].rev_min();
        let rev_max = self.nodes[id.0].rev_max();

        let Some(&latest) = self.nodes_by_path.get(&path) else {
            self.nodes_by_path.insert(path, id);
            return Ok(());
        };

        // Walk towards older segments until the insertion point.
        let mut newer: Option<NodeId> = None;
        let mut cursor = Some(latest);
        while let Some(current) = cursor {
            let segment = &self.nodes[current.0];
            if segment.rev_min() <= rev_min {
                break;
            }
            if rev_max >= segment.rev_min() {
                return Err(self.overlap_error(&path, rev_min, rev_max, current));
            }
            newer = Some(current);
            cursor = segment.before();
        }
        if let Some(older) = cursor {
            if self.nodes[older.0].rev_max() >= rev_min {
                return Err(self.overlap_error(&path, rev_min, rev_max, older));
            }
            self.nodes[older.0].set_later(Some(id));
        }

        self.nodes[id.0].set_before(cursor);
        self.nodes[id.0].set_later(newer);
        match newer {
            Some(newer) => self.nodes[newer.0].set_before(Some(id)),
            None => {
                self.nodes_by_path.insert(path, id);
            }
        }
        Ok(())
    }

    fn overlap_error(
        &self,
        path: &str,
        rev_min: Revision,
        rev_max: Revision,
        other: NodeId,
    ) -> HistoryError {
        HistoryError::SegmentOverlap {
            path: path.to_string(),
            rev_min,
            rev_max,
            other_min: self.nodes[other.0].rev_min(),
            other_max: self.nodes[other.0].rev_max(),
        }
    }
}
