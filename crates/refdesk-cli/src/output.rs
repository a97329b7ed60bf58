//! Terminal output helpers shared by the subcommands.

use clap::ValueEnum;
use colored::Colorize;
use refdesk::IngestReport;

/// Output format for commands that can emit machine-readable results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

/// Print success message
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".bright_green().bold(), msg);
}

/// Print info message
pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".bright_blue().bold(), msg);
}

/// Print warning message
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "WARNING:".bright_yellow().bold(), msg);
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.2}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Summarizes an ingestion run: cache hit or fresh index, plus one
/// warning line per skipped file.
pub fn print_ingest_report(report: &IngestReport) {
    if report.from_cache {
        print_success(&format!(
            "restored {} documents from the cache",
            report.documents_added
        ));
    } else {
        print_success(&format!(
            "indexed {} documents from {} file(s)",
            report.documents_added, report.files_processed
        ));
    }
    for (path, reason) in &report.files_failed {
        print_warning(&format!("skipped {}: {reason}", path.display()));
    }
}
