//! cherryport core library.
//!
//! This crate provides the in-memory heart of cherryport: reconstruction of
//! per-path histories from raw change logs (with rename/copy tracking,
//! implicit children, and phantom segments for incomplete windows), and the
//! cross-branch merge-dependency predictor built on two such histories.
//!
//! It performs no I/O and talks to no repository; a log reader feeds it
//! entries and an orchestrator consumes its reports.

pub mod dependency;
pub mod errors;
pub mod history;
pub mod log;
pub mod message;
pub mod revision;

// Re-exports for convenience.
pub use dependency::{Dependency, DependencyBuilder, Requirement};
pub use errors::HistoryError;
pub use history::builder::HistoryBuilder;
pub use history::change::Change;
pub use history::node::{CopyFrom, Node, NodeId};
pub use history::History;
pub use log::{ChangeAction, ChangedPath, LogEntry, NodeKind};
pub use message::{MessageConvention, TicketConvention};
pub use revision::{display_rev, Revision, FIRST_REVISION, HEAD, SINCE_EVER};
