//! Replays an ordered log-entry stream into a [`History`].

use std::sync::Arc;

use tracing::debug;

use crate::errors::HistoryError;
use crate::history::History;
use crate::log::{ChangeAction, ChangedPath, LogEntry};
use crate::message::{MessageConvention, TicketConvention};
use crate::revision::Revision;

/// Stateless adapter from log entries to history mutations.
///
/// Entries must be applied in ascending revision order; the builder does not
/// track order itself, out-of-order feeds surface as consistency errors from
/// the history. `finish()` releases the frozen, read-only result.
#[derive(Debug)]
pub struct HistoryBuilder {
    history: History,
}

impl HistoryBuilder {
    /// Start an empty history whose captured window begins at
    /// `start_revision`, using the default
    /// [`TicketConvention`](crate::message::TicketConvention).
    pub fn new(start_revision: Revision) -> Self {
        Self::with_convention(start_revision, Arc::new(TicketConvention::new()))
    }

    /// Start an empty history with a custom message convention.
    pub fn with_convention(
        start_revision: Revision,
        convention: Arc<dyn MessageConvention>,
    ) -> Self {
        Self {
            history: History::new(start_revision, convention),
        }
    }

    /// Apply one log entry: register its change, then dispatch every changed
    /// path. Paths are processed sorted by path for determinism regardless of
    /// producer order.
    pub fn apply(&mut self, entry: &LogEntry) -> Result<(), HistoryError> {
        debug!(
            revision = entry.revision,
            paths = entry.changed_paths.len(),
            "applying log entry"
        );
        self.history
            .create_change(entry.revision, &entry.author, entry.date, &entry.message)?;

        let mut changed_paths: Vec<&ChangedPath> = entry.changed_paths.iter().collect();
        changed_paths.sort_by(|a, b| a.path.cmp(&b.path));

        for cp in changed_paths {
            match cp.action {
                ChangeAction::Added => {
                    self.history
                        .added_node(cp.kind, &cp.path, entry.revision, cp.copy_from())?;
                }
                ChangeAction::Deleted => {
                    self.history.deleted_node(cp.kind, &cp.path, entry.revision)?;
                }
                ChangeAction::Modified => {
                    self.history.modified_node(cp.kind, &cp.path, entry.revision)?;
                }
                // A replace is a delete and a create of a different entity
                // at the same path, in one revision.
                ChangeAction::Replaced => {
                    self.history.deleted_node(cp.kind, &cp.path, entry.revision)?;
                    self.history
                        .added_node(cp.kind, &cp.path, entry.revision, cp.copy_from())?;
                }
            }
        }
        Ok(())
    }

    /// Apply a whole sequence of entries.
    pub fn replay<'a>(
        &mut self,
        entries: impl IntoIterator<Item = &'a LogEntry>,
    ) -> Result<(), HistoryError> {
        for entry in entries {
            self.apply(entry)?;
        }
        Ok(())
    }

    /// Freeze construction and hand out the read-only history.
    pub fn finish(self) -> History {
        self.history
    }
}
