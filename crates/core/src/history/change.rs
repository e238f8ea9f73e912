//! The immutable record of one committed revision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::MessageConvention;
use crate::revision::Revision;

/// Metadata of one committed revision, plus the derived cross-branch key.
///
/// Changes are created once by their owning [`History`](crate::History) and
/// never mutated. Identity, ordering and hashing are by revision; the key and
/// ticket id are derived from the message through the history's
/// [`MessageConvention`] at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    revision: Revision,
    author: String,
    date: DateTime<Utc>,
    message: String,
    key: String,
    ticket_id: Option<String>,
}

impl Change {
    pub(crate) fn new(
        revision: Revision,
        author: String,
        date: DateTime<Utc>,
        message: String,
        convention: &dyn MessageConvention,
    ) -> Self {
        let key = convention.key(&message);
        let ticket_id = convention.ticket_id(&message);
        Self {
            revision,
            author,
            date,
            message,
            key,
            ticket_id,
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Normalized fingerprint of the message content; identical for a change
    /// and its port on another branch.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Ticket identifier referenced by the message, if any.
    pub fn ticket_id(&self) -> Option<&str> {
        self.ticket_id.as_deref()
    }
}

impl PartialEq for Change {
    fn eq(&self, other: &Self) -> bool {
        self.revision == other.revision
    }
}

impl Eq for Change {}

impl std::hash::Hash for Change {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.revision.hash(state);
    }
}

impl PartialOrd for Change {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Change {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.revision.cmp(&other.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TicketConvention;

    fn change(revision: Revision, message: &str) -> Change {
        Change::new(
            revision,
            "alice".to_string(),
            Utc::now(),
            message.to_string(),
            &TicketConvention::new(),
        )
    }

    #[test]
    fn test_key_and_ticket_derived_once() {
        let c = change(42, "Ticket #7: Fix exporter");
        assert_eq!(c.key(), "fix_exporter");
        assert_eq!(c.ticket_id(), Some("7"));
        assert_eq!(c.message(), "Ticket #7: Fix exporter");
    }

    #[test]
    fn test_identity_is_revision() {
        let a = change(10, "one message");
        let b = change(10, "a different message");
        let c = change(11, "one message");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }
}
