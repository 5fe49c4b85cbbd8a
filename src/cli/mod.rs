//! # CLI Module
//!
//! Command-line interface for the replay ingestion core.
//!
//! ## Usage
//! ```bash
//! # Find replays with identical content
//! replay-enforcer fingerprint ~/Slippi
//!
//! # Show every file with its fingerprint
//! replay-enforcer fingerprint ~/Slippi --verbose
//!
//! # JSON output
//! replay-enforcer fingerprint ~/Slippi --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use replay_enforcer::core::hasher::{fingerprint, Fingerprint};
use replay_enforcer::core::registry::DuplicateRegistry;
use replay_enforcer::core::scanner::{collect_batch, ScanConfig};
use replay_enforcer::error::{EnforcerError, IngestError, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Replay Enforcer - Batch ingestion for Slippi replays
#[derive(Parser, Debug)]
#[command(name = "replay-enforcer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fingerprint replays and report files with identical content
    Fingerprint {
        /// Replay files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Include hidden files and directories
        #[arg(long)]
        include_hidden: bool,

        /// Maximum directory depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (duplicate paths only)
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum FileStatus {
    Unique,
    Duplicate,
    Unreadable,
}

#[derive(Debug, Serialize)]
struct FileEntry {
    path: PathBuf,
    status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<Fingerprint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct FingerprintReport {
    total: usize,
    unique: usize,
    duplicates: usize,
    unreadable: usize,
    duration_ms: u64,
    files: Vec<FileEntry>,
}

impl FingerprintReport {
    fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fingerprint {
            paths,
            output,
            include_hidden,
            max_depth,
            verbose,
        } => run_fingerprint(paths, output, include_hidden, max_depth, verbose),
    }
}

fn run_fingerprint(
    paths: Vec<PathBuf>,
    output: OutputFormat,
    include_hidden: bool,
    max_depth: Option<usize>,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();
    let start = Instant::now();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Replay Enforcer").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let config = ScanConfig {
        include_hidden,
        max_depth,
        ..Default::default()
    };
    let scan = collect_batch(&paths, &config);

    for error in &scan.errors {
        term.write_line(&format!("{} {}", style("!").yellow().bold(), error))
            .ok();
    }
    if scan.replays.is_empty() {
        return Err(EnforcerError::Config(format!(
            "no replay files found in {} path(s)",
            paths.len()
        )));
    }

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(scan.replays.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb.set_message("fingerprinting");
        Some(pb)
    } else {
        None
    };

    // Hash in parallel; classify in scan order so "first seen" is stable
    let hashed: Vec<(PathBuf, std::result::Result<Fingerprint, IngestError>)> = scan
        .replays
        .par_iter()
        .map(|path| {
            let result = fs::read(path)
                .map(|bytes| fingerprint(&bytes))
                .map_err(|source| IngestError::Read {
                    path: path.clone(),
                    source,
                });
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            (path.clone(), result)
        })
        .collect();

    if let Some(ref pb) = progress {
        pb.finish_and_clear();
    }

    let mut registry = DuplicateRegistry::new();
    let files: Vec<FileEntry> = hashed
        .into_iter()
        .map(|(path, result)| match result {
            Ok(fp) => {
                let status = if registry.register_if_new(&fp) {
                    FileStatus::Unique
                } else {
                    FileStatus::Duplicate
                };
                FileEntry {
                    path,
                    status,
                    fingerprint: Some(fp),
                    error: None,
                }
            }
            Err(e) => FileEntry {
                path,
                status: FileStatus::Unreadable,
                fingerprint: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let mut report = FingerprintReport {
        total: files.len(),
        unique: 0,
        duplicates: 0,
        unreadable: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        files,
    };
    report.unique = report.count(FileStatus::Unique);
    report.duplicates = report.count(FileStatus::Duplicate);
    report.unreadable = report.count(FileStatus::Unreadable);

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, verbose),
        OutputFormat::Json => print_json_results(&report),
        OutputFormat::Minimal => print_minimal_results(&report),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, report: &FingerprintReport, verbose: bool) {
    term.write_line(&format!("{} Fingerprinting Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} replays fingerprinted in {:.1}s",
        style(report.total).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} unique", style(report.unique).cyan()))
        .ok();
    term.write_line(&format!("  {} duplicates", style(report.duplicates).yellow()))
        .ok();
    if report.unreadable > 0 {
        term.write_line(&format!("  {} unreadable", style(report.unreadable).red()))
            .ok();
    }
    term.write_line("").ok();

    for entry in &report.files {
        let (marker, show) = match entry.status {
            FileStatus::Unique => (style("○").dim().to_string(), verbose),
            FileStatus::Duplicate => (style("≡").yellow().to_string(), true),
            FileStatus::Unreadable => (style("✗").red().to_string(), true),
        };
        if !show {
            continue;
        }

        let detail = match (&entry.fingerprint, &entry.error) {
            (_, Some(error)) => style(error.clone()).red().to_string(),
            (Some(fp), None) => style(fp.short().to_string()).dim().to_string(),
            (None, None) => String::new(),
        };
        term.write_line(&format!("  {} {} {}", marker, entry.path.display(), detail))
            .ok();
    }

    if report.duplicates == 0 {
        term.write_line(&format!("  {} No duplicates found!", style("🎉").green()))
            .ok();
    }
}

fn print_json_results(report: &FingerprintReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to serialize report"),
    }
}

fn print_minimal_results(report: &FingerprintReport) {
    for entry in &report.files {
        if entry.status == FileStatus::Duplicate {
            println!("{}", entry.path.display());
        }
    }
}
