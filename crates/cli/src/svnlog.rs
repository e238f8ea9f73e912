//! Parser for pre-fetched `svn log --xml -v` output.
//!
//! Scans the XML textually rather than through a DOM: log files are large,
//! their structure is fixed, and tolerance for truncated or partially
//! populated entries matters more than schema validation. Entries with a
//! missing or unparseable revision are skipped with a warning; missing
//! author, date, or kind attributes degrade to defaults.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use cherryport_core::{ChangeAction, ChangedPath, LogEntry, NodeKind};

/// Parse a full `svn log --xml -v` document into log entries, sorted
/// ascending by revision ready for replay.
pub fn parse_log(xml: &str) -> Result<Vec<LogEntry>> {
    debug!("parsing svn log XML ({} bytes)", xml.len());
    let mut entries = Vec::new();
    let parts: Vec<&str> = xml.split("<logentry").collect();
    for part in parts.iter().skip(1) {
        let entry_xml = match part.find("</logentry>") {
            Some(pos) => &part[..pos],
            None => part,
        };
        let revision = match extract_attribute_from_fragment(entry_xml, "revision")
            .and_then(|s| s.parse::<i64>().ok())
        {
            Some(rev) => rev,
            None => {
                warn!("skipping log entry with missing or unparseable revision attribute");
                continue;
            }
        };
        let author = extract_tag_content(entry_xml, "author").unwrap_or_default();
        let date = match extract_tag_content(entry_xml, "date") {
            Some(raw) => parse_date(revision, &raw),
            None => {
                warn!(revision, "log entry has no date");
                DateTime::<Utc>::UNIX_EPOCH
            }
        };
        let message = extract_tag_content(entry_xml, "msg").unwrap_or_default();
        let changed_paths = parse_changed_paths(revision, entry_xml);
        entries.push(LogEntry {
            revision,
            author,
            date,
            message,
            changed_paths,
        });
    }
    entries.sort_by_key(|e| e.revision);
    debug!(count = entries.len(), "parsed svn log entries");
    Ok(entries)
}

fn parse_date(revision: i64, raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(date) => date.with_timezone(&Utc),
        Err(_) => {
            warn!(revision, date = raw, "unparseable date, substituting epoch");
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

fn parse_changed_paths(revision: i64, entry_xml: &str) -> Vec<ChangedPath> {
    let mut paths = Vec::new();
    let paths_block = match entry_xml.find("<paths>") {
        Some(start) => {
            let rest = &entry_xml[start..];
            match rest.find("</paths>") {
                Some(end) => &rest[..end],
                None => return paths,
            }
        }
        None => return paths,
    };
    let parts: Vec<&str> = paths_block.split("<path").collect();
    for part in parts.iter().skip(1) {
        let fragment = match part.find("</path>") {
            Some(pos) => &part[..pos],
            None => continue,
        };
        let action_code = extract_attribute_from_fragment(fragment, "action").unwrap_or_default();
        let Some(action) = ChangeAction::from_svn_code(&action_code) else {
            warn!(revision, action = action_code, "skipping path with unknown action");
            continue;
        };
        let kind = extract_attribute_from_fragment(fragment, "kind")
            .map(|s| NodeKind::from_str_val(&s))
            .unwrap_or(NodeKind::Unknown);
        let copy_from_path =
            extract_attribute_from_fragment(fragment, "copyfrom-path").map(|s| xml_unescape(&s));
        let copy_from_revision = extract_attribute_from_fragment(fragment, "copyfrom-rev")
            .and_then(|s| s.parse::<i64>().ok());
        let path = match fragment.find('>') {
            Some(pos) => xml_unescape(fragment[pos + 1..].trim()),
            None => String::new(),
        };
        paths.push(ChangedPath {
            path,
            action,
            kind,
            copy_from_path,
            copy_from_revision,
        });
    }
    paths
}

fn extract_tag_content(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut search_from = 0;
    while let Some(rel_pos) = xml[search_from..].find(&open) {
        let start_pos = search_from + rel_pos;
        let after_open = &xml[start_pos + open.len()..];
        // Ensure we matched the tag exactly (next char must be '>' or whitespace for attributes)
        if let Some(ch) = after_open.chars().next() {
            if ch != '>' && !ch.is_ascii_whitespace() {
                // False match (e.g. <msgid> when looking for <msg>), keep searching
                search_from = start_pos + open.len();
                continue;
            }
        }
        let content_start = match after_open.find('>') {
            Some(pos) => pos + 1,
            None => return None,
        };
        let content = &after_open[content_start..];
        let end_pos = content.find(&close)?;
        return Some(xml_unescape(content[..end_pos].trim()));
    }
    None
}

/// Unescape standard XML entities.
fn xml_unescape(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

fn extract_attribute_from_fragment(fragment: &str, attr: &str) -> Option<String> {
    let pattern_dq = format!("{}=\"", attr);
    if let Some(pos) = fragment.find(&pattern_dq) {
        let after = &fragment[pos + pattern_dq.len()..];
        let end = after.find('"')?;
        return Some(after[..end].to_string());
    }
    let pattern_sq = format!("{}='", attr);
    if let Some(pos) = fragment.find(&pattern_sq) {
        let after = &fragment[pos + pattern_sq.len()..];
        let end = after.find('\'')?;
        return Some(after[..end].to_string());
    }
    None
}
