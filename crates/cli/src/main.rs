//! cherryport command-line merge analyzer.
//!
//! Reads pre-fetched `svn log --xml -v` files for a source and a target
//! branch, reconstructs both path histories, and reports which of the
//! revisions selected for porting depend on earlier, un-ported changes.
//! The report is advisory: the tool never executes a merge and never talks
//! to a repository.

mod report;
mod style;
mod svnlog;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cherryport_core::{
    DependencyBuilder, History, HistoryBuilder, LogEntry, Revision, FIRST_REVISION,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// cherryport command-line merge analyzer.
#[derive(Parser, Debug)]
#[command(
    name = "cherryport",
    version,
    about = "Predict which cherry-picks between branches depend on un-ported changes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a candidate merge set for required predecessor changes.
    Analyze {
        /// Pre-fetched `svn log --xml -v` file covering the source branch.
        #[arg(long)]
        source_log: PathBuf,

        /// Pre-fetched `svn log --xml -v` file covering the target branch.
        #[arg(long)]
        target_log: PathBuf,

        /// Path prefix of the source branch, e.g. /branches/unstable.
        #[arg(long)]
        source_branch: String,

        /// Path prefix of the target branch, e.g. /branches/stable.
        #[arg(long)]
        target_branch: String,

        /// Source-branch revisions selected for porting, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        merge: Vec<Revision>,

        /// Restrict analysis to these modules (path segment after the
        /// branch prefix), comma separated.
        #[arg(long, value_delimiter = ',')]
        modules: Option<Vec<String>>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Oldest captured revision of the source log. Defaults to the
        /// oldest entry in the file; pass 1 only for a complete log.
        #[arg(long)]
        source_start: Option<Revision>,

        /// Oldest captured revision of the target log.
        #[arg(long)]
        target_start: Option<Revision>,
    },

    /// Print every reconstructed history segment for one path.
    Timeline {
        /// Pre-fetched `svn log --xml -v` file.
        #[arg(long)]
        log: PathBuf,

        /// Repository path to inspect.
        #[arg(long)]
        path: String,

        /// Oldest captured revision of the log. Defaults to the oldest
        /// entry in the file.
        #[arg(long)]
        start: Option<Revision>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Table,
    Json,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Minimal logging by default, overridable via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            source_log,
            target_log,
            source_branch,
            target_branch,
            merge,
            modules,
            format,
            source_start,
            target_start,
        } => cmd_analyze(
            &source_log,
            &target_log,
            &source_branch,
            &target_branch,
            &merge,
            modules,
            format,
            source_start,
            target_start,
        ),
        Commands::Timeline { log, path, start } => cmd_timeline(&log, &path, start),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    source_log: &Path,
    target_log: &Path,
    source_branch: &str,
    target_branch: &str,
    merge: &[Revision],
    modules: Option<Vec<String>>,
    format: Format,
    source_start: Option<Revision>,
    target_start: Option<Revision>,
) -> Result<()> {
    let source_entries = load_entries(source_log)?;
    let target_entries = load_entries(target_log)?;

    let merge_log = select_merge_entries(&source_entries, merge)?;

    let source = build_history(&source_entries, source_start)
        .context("failed to reconstruct the source branch history")?;
    let target = build_history(&target_entries, target_start)
        .context("failed to reconstruct the target branch history")?;

    let mut builder = DependencyBuilder::new(source_branch, target_branch, modules, &source, &target);
    builder
        .analyze_conflicts(&merge_log)
        .context("dependency analysis failed")?;

    match format {
        Format::Table => report::render_table(builder.dependencies(), &source),
        Format::Json => report::render_json(builder.dependencies(), &source)?,
    }
    Ok(())
}

fn cmd_timeline(log: &Path, path: &str, start: Option<Revision>) -> Result<()> {
    let entries = load_entries(log)?;
    let history =
        build_history(&entries, start).context("failed to reconstruct the path history")?;
    report::render_timeline(&history, path);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_entries(path: &Path) -> Result<Vec<LogEntry>> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read log file {}", path.display()))?;
    svnlog::parse_log(&xml)
        .with_context(|| format!("failed to parse log file {}", path.display()))
}

fn build_history(entries: &[LogEntry], start: Option<Revision>) -> Result<History> {
    let start = start
        .or_else(|| entries.first().map(|e| e.revision))
        .unwrap_or(FIRST_REVISION);
    let mut builder = HistoryBuilder::new(start);
    builder.replay(entries)?;
    Ok(builder.finish())
}

fn select_merge_entries(entries: &[LogEntry], merge: &[Revision]) -> Result<Vec<LogEntry>> {
    let mut selected = Vec::with_capacity(merge.len());
    for revision in merge {
        match entries.iter().find(|e| e.revision == *revision) {
            Some(entry) => selected.push(entry.clone()),
            None => bail!("revision r{} is not present in the source log", revision),
        }
    }
    selected.sort_by_key(|e| e.revision);
    Ok(selected)
}
