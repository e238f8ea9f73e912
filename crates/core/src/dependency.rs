//! Cross-branch merge-dependency prediction.
//!
//! Given the reconstructed histories of a source and a target branch and the
//! set of changes selected for porting, the [`DependencyBuilder`] predicts
//! which earlier, not-yet-ported changes must be applied first to avoid a
//! conflict. Matching between branches is by normalized message key, never
//! by revision number: the same logical edit gets a different revision on
//! each branch.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::HistoryError;
use crate::history::change::Change;
use crate::history::node::NodeId;
use crate::history::History;
use crate::log::{LogEntry, NodeKind};
use crate::revision::{Revision, HEAD};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One required predecessor of a change being merged, with the segments on
/// which a conflict is expected if the order is violated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub change: Change,
    pub nodes: BTreeSet<NodeId>,
}

/// A change being merged together with every not-yet-ported predecessor it
/// depends on. Advisory: violating the order risks a conflict, it does not
/// prevent the merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub change: Change,
    pub required: BTreeMap<Revision, Requirement>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Walks every source-branch file segment and accumulates the
/// required-predecessor map for one candidate merge set.
pub struct DependencyBuilder<'a> {
    source_branch: String,
    target_branch: String,
    /// Allow-list over the path segment following the branch prefix.
    modules: Option<BTreeSet<String>>,
    source: &'a History,
    target: &'a History,
    dependencies: BTreeMap<Revision, Dependency>,
}

impl<'a> DependencyBuilder<'a> {
    pub fn new(
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
        modules: Option<Vec<String>>,
        source: &'a History,
        target: &'a History,
    ) -> Self {
        Self {
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            modules: modules.map(|m| m.into_iter().collect()),
            source,
            target,
            dependencies: BTreeMap::new(),
        }
    }

    /// Analyze the merge candidate set against both branch histories.
    ///
    /// `merge_log` is the ordered list of source-branch log entries selected
    /// for porting now; a revision the source history never recorded is
    /// fatal.
    pub fn analyze_conflicts(&mut self, merge_log: &[LogEntry]) -> Result<(), HistoryError> {
        let source = self.source;
        let target = self.target;
        info!(
            source_branch = %self.source_branch,
            target_branch = %self.target_branch,
            merge_count = merge_log.len(),
            "analyzing merge dependencies"
        );

        // Tickets the target branch already carries. A ticket about to be
        // ported now is no pre-existing target-side fact, so it is removed.
        let mut ported_tickets: HashSet<String> = target
            .changes()
            .values()
            .filter_map(|c| c.ticket_id().map(str::to_string))
            .collect();

        let mut merged: BTreeMap<Revision, &Change> = BTreeMap::new();
        for entry in merge_log {
            let change = source.change(entry.revision)?;
            if let Some(ticket) = change.ticket_id() {
                ported_tickets.remove(ticket);
            }
            merged.insert(change.revision(), change);
        }

        for node in source.touched_nodes() {
            // Only file conflicts matter; recorded directories are skipped,
            // unknown kinds may be files and are analyzed.
            if node.kind() == NodeKind::Dir {
                continue;
            }
            let Some(rest) = node.path().strip_prefix(self.source_branch.as_str()) else {
                continue;
            };
            if !rest.starts_with('/') {
                continue;
            }
            if let Some(modules) = &self.modules {
                let module = rest[1..].split('/').next().unwrap_or("");
                if !modules.contains(module) {
                    continue;
                }
            }

            let target_path = format!("{}{}", self.target_branch, rest);
            // No live counterpart on the target branch: every un-merged
            // source change is then a potential dependency.
            let target_changes: HashMap<&str, &Change> =
                match target.current_node(node.kind(), &target_path) {
                    Some(target_node) => target
                        .changes_up_to(target_node.id(), HEAD)
                        .into_iter()
                        .map(|c| (c.key(), c))
                        .collect(),
                    None => HashMap::new(),
                };

            let mut merges: Vec<&Change> = Vec::new();
            let mut pending: Vec<&Change> = Vec::new();

            for change in source.changes_up_to(node.id(), HEAD) {
                if merged.contains_key(&change.revision()) {
                    if !pending.is_empty() {
                        debug!(
                            path = node.path(),
                            revision = change.revision(),
                            pending = pending.len(),
                            "merge candidate depends on un-ported changes"
                        );
                        for required in &pending {
                            self.add_requirement(change, required, node.id());
                        }
                    }
                    merges.push(change);
                } else if !target_changes.contains_key(change.key()) {
                    pending.push(change);
                    // The tracker believes this ticket already reached the
                    // target, yet on this file no matching change exists:
                    // every earlier merge candidate becomes conflict-prone.
                    if let Some(ticket) = change.ticket_id() {
                        if ported_tickets.contains(ticket) {
                            debug!(
                                path = node.path(),
                                revision = change.revision(),
                                ticket,
                                "ticket believed ported but change missing on this file"
                            );
                            for merged_change in &merges {
                                self.add_requirement(merged_change, change, node.id());
                            }
                        }
                    }
                }
            }
        }

        info!(
            count = self.dependencies.len(),
            "dependency analysis complete"
        );
        Ok(())
    }

    /// The accumulated required-predecessor map, keyed by the merged
    /// change's revision.
    pub fn dependencies(&self) -> &BTreeMap<Revision, Dependency> {
        &self.dependencies
    }

    pub fn into_dependencies(self) -> BTreeMap<Revision, Dependency> {
        self.dependencies
    }

    fn add_requirement(&mut self, merged: &Change, required: &Change, node: NodeId) {
        let dependency = self
            .dependencies
            .entry(merged.revision())
            .or_insert_with(|| Dependency {
                change: merged.clone(),
                required: BTreeMap::new(),
            });
        let requirement = dependency
            .required
            .entry(required.revision())
            .or_insert_with(|| Requirement {
                change: required.clone(),
                nodes: BTreeSet::new(),
            });
        requirement.nodes.insert(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::builder::HistoryBuilder;
    use crate::log::{ChangeAction, ChangedPath};
    use chrono::Utc;

    fn cp(path: &str, action: ChangeAction) -> ChangedPath {
        ChangedPath {
            path: path.to_string(),
            action,
            kind: NodeKind::File,
            copy_from_path: None,
            copy_from_revision: None,
        }
    }

    fn entry(revision: Revision, message: &str, changed_paths: Vec<ChangedPath>) -> LogEntry {
        LogEntry {
            revision,
            author: "alice".to_string(),
            date: Utc::now(),
            message: message.to_string(),
            changed_paths,
        }
    }

    fn build(start: Revision, entries: &[LogEntry]) -> History {
        let mut builder = HistoryBuilder::new(start);
        builder.replay(entries).unwrap();
        builder.finish()
    }

    #[test]
    fn test_unported_predecessor_is_reported() {
        let source = build(
            1,
            &[
                entry(10, "first change", vec![cp("/b1/f", ChangeAction::Modified)]),
                entry(20, "second change", vec![cp("/b1/f", ChangeAction::Modified)]),
            ],
        );
        let target = build(1, &[]);
        let merge_log = vec![entry(20, "second change", vec![])];

        let mut builder = DependencyBuilder::new("/b1", "/b2", None, &source, &target);
        builder.analyze_conflicts(&merge_log).unwrap();

        let deps = builder.dependencies();
        assert_eq!(deps.len(), 1);
        let dep = &deps[&20];
        assert_eq!(dep.change.revision(), 20);
        assert_eq!(dep.required.len(), 1);
        let req = &dep.required[&10];
        assert_eq!(req.change.revision(), 10);
        let node = source.node(*req.nodes.iter().next().unwrap());
        assert_eq!(node.path(), "/b1/f");
    }

    #[test]
    fn test_predecessor_already_on_target_by_key() {
        let source = build(
            1,
            &[
                entry(10, "first change", vec![cp("/b1/f", ChangeAction::Modified)]),
                entry(20, "second change", vec![cp("/b1/f", ChangeAction::Modified)]),
            ],
        );
        // The target carries the same logical edit under a different
        // revision, with a port marker in the message.
        let target = build(
            1,
            &[entry(
                100,
                "[10]: first change",
                vec![cp("/b2/f", ChangeAction::Modified)],
            )],
        );
        let merge_log = vec![entry(20, "second change", vec![])];

        let mut builder = DependencyBuilder::new("/b1", "/b2", None, &source, &target);
        builder.analyze_conflicts(&merge_log).unwrap();
        assert!(builder.dependencies().is_empty());
    }

    #[test]
    fn test_merged_changes_need_no_entry() {
        let source = build(
            1,
            &[
                entry(10, "first change", vec![cp("/b1/f", ChangeAction::Modified)]),
                entry(20, "second change", vec![cp("/b1/f", ChangeAction::Modified)]),
            ],
        );
        let target = build(1, &[]);
        // Both changes are ported together; nothing is left pending.
        let merge_log = vec![
            entry(10, "first change", vec![]),
            entry(20, "second change", vec![]),
        ];

        let mut builder = DependencyBuilder::new("/b1", "/b2", None, &source, &target);
        builder.analyze_conflicts(&merge_log).unwrap();
        assert!(builder.dependencies().is_empty());
    }

    #[test]
    fn test_unknown_merge_revision_is_fatal() {
        let source = build(1, &[]);
        let target = build(1, &[]);
        let merge_log = vec![entry(99, "never recorded", vec![])];
        let mut builder = DependencyBuilder::new("/b1", "/b2", None, &source, &target);
        assert!(matches!(
            builder.analyze_conflicts(&merge_log),
            Err(HistoryError::RevisionNotFound(99))
        ));
    }

    #[test]
    fn test_ticket_believed_ported_triggers_retroactive_fixup() {
        let source = build(
            1,
            &[
                entry(
                    10,
                    "Ticket #7: early fix",
                    vec![cp("/b1/f", ChangeAction::Modified)],
                ),
                entry(
                    20,
                    "Ticket #9: later fix",
                    vec![cp("/b1/f", ChangeAction::Modified)],
                ),
            ],
        );
        // The tracker believes ticket 9 reached the target, but only via a
        // change on another file.
        let target = build(
            1,
            &[entry(
                100,
                "Ticket #9: unrelated edit",
                vec![cp("/b2/other", ChangeAction::Modified)],
            )],
        );
        let merge_log = vec![entry(10, "Ticket #7: early fix", vec![])];

        let mut builder = DependencyBuilder::new("/b1", "/b2", None, &source, &target);
        builder.analyze_conflicts(&merge_log).unwrap();

        let deps = builder.dependencies();
        assert_eq!(deps.len(), 1);
        let dep = &deps[&10];
        assert!(dep.required.contains_key(&20));
    }

    #[test]
    fn test_module_filter_limits_analysis() {
        let source = build(
            1,
            &[
                entry(
                    10,
                    "first change",
                    vec![
                        cp("/b1/core/f", ChangeAction::Modified),
                        cp("/b1/web/f", ChangeAction::Modified),
                    ],
                ),
                entry(
                    20,
                    "second change",
                    vec![
                        cp("/b1/core/f", ChangeAction::Modified),
                        cp("/b1/web/f", ChangeAction::Modified),
                    ],
                ),
            ],
        );
        let target = build(1, &[]);
        let merge_log = vec![entry(20, "second change", vec![])];

        let mut builder = DependencyBuilder::new(
            "/b1",
            "/b2",
            Some(vec!["core".to_string()]),
            &source,
            &target,
        );
        builder.analyze_conflicts(&merge_log).unwrap();

        let dep = &builder.dependencies()[&20];
        let req = &dep.required[&10];
        assert_eq!(req.nodes.len(), 1);
        let node = source.node(*req.nodes.iter().next().unwrap());
        assert_eq!(node.path(), "/b1/core/f");
    }

    #[test]
    fn test_directories_and_foreign_branches_are_skipped() {
        let dir = ChangedPath {
            path: "/b1/dir".to_string(),
            action: ChangeAction::Added,
            kind: NodeKind::Dir,
            copy_from_path: None,
            copy_from_revision: None,
        };
        let source = build(
            1,
            &[
                entry(
                    10,
                    "first change",
                    vec![dir, cp("/elsewhere/f", ChangeAction::Modified)],
                ),
                entry(20, "second change", vec![cp("/b1/dir", ChangeAction::Modified)]),
            ],
        );
        let target = build(1, &[]);
        let merge_log = vec![entry(20, "second change", vec![])];

        let mut builder = DependencyBuilder::new("/b1", "/b2", None, &source, &target);
        builder.analyze_conflicts(&merge_log).unwrap();
        assert!(builder.dependencies().is_empty());
    }
}
