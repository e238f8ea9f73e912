//! Rendering of dependency reports and path timelines.

use std::collections::BTreeMap;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;

use cherryport_core::{display_rev, Dependency, History, Node, Revision, HEAD};

use crate::style;

// ---------------------------------------------------------------------------
// Dependency report
// ---------------------------------------------------------------------------

/// Print the dependency report as a table with a summary line.
pub fn render_table(dependencies: &BTreeMap<Revision, Dependency>, source: &History) {
    println!();
    if dependencies.is_empty() {
        println!("{}", style::success("No dependency hazards detected"));
        println!();
        return;
    }

    println!(
        "{}",
        style::header(&format!("Merge dependencies ({})", dependencies.len()))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Merge", "Requires", "Ticket", "Message", "Paths"]);

    let mut required_total = 0;
    for dependency in dependencies.values() {
        for requirement in dependency.required.values() {
            required_total += 1;
            let paths: Vec<&str> = requirement
                .nodes
                .iter()
                .map(|id| source.node(*id).path())
                .collect();
            table.add_row(vec![
                Cell::new(format!("r{}", dependency.change.revision())),
                Cell::new(format!("r{}", requirement.change.revision())),
                Cell::new(requirement.change.ticket_id().unwrap_or("—")),
                Cell::new(first_line(requirement.change.message(), 60)),
                Cell::new(paths.join("\n")),
            ]);
        }
    }

    println!("{}", table);
    println!();
    println!(
        "{}",
        style::warn(&format!(
            "{} merge candidate(s) depend on {} un-ported change(s); apply those first",
            dependencies.len(),
            required_total
        ))
    );
    println!();
}

#[derive(Serialize)]
struct JsonDependency<'a> {
    revision: Revision,
    message: &'a str,
    ticket: Option<&'a str>,
    requires: Vec<JsonRequirement<'a>>,
}

#[derive(Serialize)]
struct JsonRequirement<'a> {
    revision: Revision,
    message: &'a str,
    ticket: Option<&'a str>,
    paths: Vec<&'a str>,
}

/// Print the dependency report as JSON, with node handles resolved to paths.
pub fn render_json(dependencies: &BTreeMap<Revision, Dependency>, source: &History) -> Result<()> {
    let report: Vec<JsonDependency<'_>> = dependencies
        .values()
        .map(|dependency| JsonDependency {
            revision: dependency.change.revision(),
            message: dependency.change.message(),
            ticket: dependency.change.ticket_id(),
            requires: dependency
                .required
                .values()
                .map(|requirement| JsonRequirement {
                    revision: requirement.change.revision(),
                    message: requirement.change.message(),
                    ticket: requirement.change.ticket_id(),
                    paths: requirement
                        .nodes
                        .iter()
                        .map(|id| source.node(*id).path())
                        .collect(),
                })
                .collect(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Path timeline
// ---------------------------------------------------------------------------

/// Print every reconstructed segment for one path, oldest first.
pub fn render_timeline(history: &History, path: &str) {
    let mut segments: Vec<&Node> = history.touched_nodes().filter(|n| n.path() == path).collect();
    segments.sort_by_key(|n| n.rev_min());

    println!();
    if segments.is_empty() {
        println!("{}", style::dim(&format!("no recorded history for {}", path)));
        println!();
        return;
    }

    println!(
        "{}",
        style::header(&format!("History of {} ({} segment(s))", path, segments.len()))
    );
    for segment in segments {
        println!();
        let liveness = if segment.is_alive() { " (alive)" } else { "" };
        println!(
            "{}  [{}..{}] {}{}",
            style::header(path),
            display_rev(segment.rev_min()),
            display_rev(segment.rev_max()),
            segment.kind(),
            liveness
        );
        if let Some(copy) = segment.copy_from() {
            println!(
                "  {}",
                style::dim(&format!(
                    "copied from {}@{}",
                    history.node(copy.node).path(),
                    display_rev(copy.revision)
                ))
            );
        }
        for change in history.changes_up_to(segment.id(), HEAD) {
            println!(
                "  r{:<8} {:<12} {}",
                change.revision(),
                change.author(),
                style::dim(&first_line(change.message(), 70))
            );
        }
    }
    println!();
}

fn first_line(message: &str, max_len: usize) -> String {
    let line = message.lines().next().unwrap_or("");
    if line.chars().count() <= max_len {
        line.to_string()
    } else {
        let truncated: String = line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
