//! Commit-message conventions: ticket references and cross-branch keys.
//!
//! A ported commit carries the same message content as its original, modulo
//! a port marker and a different revision number. The convention extracts a
//! ticket identifier and a normalized "detail" fingerprint from a message so
//! that the same logical edit can be matched across branches.

use regex_lite::Regex;

/// A commit-message convention.
///
/// [`History`](crate::History) derives every [`Change`](crate::Change) key
/// and ticket id through one of these, so repositories with a different
/// message discipline only need to supply their own implementation.
pub trait MessageConvention: std::fmt::Debug + Send + Sync {
    /// The ticket identifier the message references, if the convention
    /// recognizes one.
    fn ticket_id(&self, message: &str) -> Option<String>;

    /// The content portion of the message, after any ticket-reference
    /// prefix. `None` when the message carries no recognizable prefix.
    fn detail<'a>(&self, message: &'a str) -> Option<&'a str>;

    /// Normalized fingerprint of the message content, identical for a commit
    /// and its port on another branch.
    ///
    /// The detail portion (or, without one, the whole message) is stripped of
    /// one leading `[<digits>]:` port marker and normalized: non-alphanumeric
    /// runs collapse to a single separator, letters are lower-cased, words
    /// are joined with underscores.
    fn key(&self, message: &str) -> String {
        let detail = self.detail(message).unwrap_or(message);
        normalize(strip_port_marker(detail))
    }
}

/// Strip one leading `[<digits>]:` port marker, as written by merge tools
/// when committing a ported change.
fn strip_port_marker(s: &str) -> &str {
    let trimmed = s.trim_start();
    if let Some(rest) = trimmed.strip_prefix('[') {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            if let Some(rest) = rest[digits..].strip_prefix("]:") {
                return rest;
            }
        }
    }
    s
}

/// Collapse non-alphanumeric runs, lower-case, join words with underscores.
fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for ch in s.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Default convention
// ---------------------------------------------------------------------------

/// The `Ticket #<id>:` message convention.
///
/// Messages look like `Ticket #4711: Fix encoding in exporter`; ported
/// commits prepend the original revision, `Ticket #4711: [1234]: Fix
/// encoding in exporter`.
#[derive(Debug)]
pub struct TicketConvention {
    ticket_prefix: Regex,
}

impl TicketConvention {
    pub fn new() -> Self {
        Self {
            // Compiled once; the pattern is a literal and cannot fail.
            ticket_prefix: Regex::new(r"(?i)^\s*ticket\s*#\s*(\d+)\s*:\s*")
                .expect("ticket prefix pattern"),
        }
    }
}

impl Default for TicketConvention {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageConvention for TicketConvention {
    fn ticket_id(&self, message: &str) -> Option<String> {
        self.ticket_prefix
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn detail<'a>(&self, message: &'a str) -> Option<&'a str> {
        self.ticket_prefix
            .find(message)
            .map(|m| &message[m.end()..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_id_extraction() {
        let conv = TicketConvention::new();
        assert_eq!(
            conv.ticket_id("Ticket #4711: Fix encoding"),
            Some("4711".to_string())
        );
        assert_eq!(
            conv.ticket_id("ticket #9: lower-case works"),
            Some("9".to_string())
        );
        assert_eq!(conv.ticket_id("Fix encoding, no ticket"), None);
        assert_eq!(conv.ticket_id("Mentions Ticket #5 mid-message"), None);
    }

    #[test]
    fn test_detail_extraction() {
        let conv = TicketConvention::new();
        assert_eq!(
            conv.detail("Ticket #4711: Fix encoding"),
            Some("Fix encoding")
        );
        assert_eq!(conv.detail("no prefix here"), None);
    }

    #[test]
    fn test_key_normalization() {
        let conv = TicketConvention::new();
        assert_eq!(conv.key("Ticket #4711: Fix encoding"), "fix_encoding");
        assert_eq!(
            conv.key("Ticket #4711: Fix  -- encoding!!"),
            "fix_encoding"
        );
        assert_eq!(conv.key("Whole message, no prefix"), "whole_message_no_prefix");
    }

    #[test]
    fn test_key_strips_port_marker() {
        let conv = TicketConvention::new();
        // A port of r1234 carries the original detail behind the marker.
        assert_eq!(
            conv.key("Ticket #4711: [1234]: Fix encoding"),
            conv.key("Ticket #4711: Fix encoding")
        );
        // The marker is only stripped when complete.
        assert_eq!(conv.key("[12 34]: broken marker"), "12_34_broken_marker");
        assert_eq!(conv.key("[]: empty marker"), "empty_marker");
    }

    #[test]
    fn test_keys_match_across_branches() {
        let conv = TicketConvention::new();
        let original = "Ticket #77: Guard against empty path";
        let ported = "Ticket #77: [512]: Guard against empty path";
        assert_eq!(conv.key(original), conv.key(ported));
    }

    #[test]
    fn test_normalize_edge_cases() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("CamelCase Words"), "camelcase_words");
        assert_eq!(normalize("..leading & trailing.."), "leading_trailing");
    }
}
