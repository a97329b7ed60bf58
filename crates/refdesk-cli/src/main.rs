// Args structs flow through the clap dispatch by value.
#![allow(clippy::needless_pass_by_value)]

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod helpers;
mod output;

use commands::{cache_clear, cache_info, ingest, query, rebuild};

/// Ingest library documents, answer questions grounded in them, and
/// manage the on-disk vector cache.
///
/// The index lives in memory; `ingest` persists it to a cache directory
/// so later runs skip the embedding provider. `query` builds or loads
/// the index first, so a cold `query` is a full ingestion run.
#[derive(Parser)]
#[command(name = "refdesk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Document QA over a local library corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the document index for a directory (cache-aware)
    Ingest(ingest::IngestArgs),

    /// Ask a question grounded in the indexed documents
    Query(query::QueryArgs),

    /// Describe the on-disk cache artifacts
    CacheInfo(cache_info::CacheInfoArgs),

    /// Delete the on-disk cache artifacts
    CacheClear(cache_clear::CacheClearArgs),

    /// Re-ingest from source files, bypassing and rewriting the cache
    Rebuild(rebuild::RebuildArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so answers and JSON stay pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest(args) => ingest::run(args).await,
        Commands::Query(args) => query::run(args).await,
        Commands::CacheInfo(args) => cache_info::run(args).await,
        Commands::CacheClear(args) => cache_clear::run(args).await,
        Commands::Rebuild(args) => rebuild::run(args).await,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses_known_subcommands() {
        let cli = Cli::try_parse_from(["refdesk", "ingest", "belgeler"]).expect("parse ingest");
        assert!(matches!(cli.command, Commands::Ingest(_)));

        let cli = Cli::try_parse_from([
            "refdesk",
            "query",
            "Simyacı rafta mı?",
            "--dir",
            "belgeler",
        ])
        .expect("parse query");
        assert!(matches!(cli.command, Commands::Query(_)));

        let cli = Cli::try_parse_from(["refdesk", "cache-info"]).expect("parse cache-info");
        assert!(matches!(cli.command, Commands::CacheInfo(_)));
    }

    #[test]
    fn clap_enforces_required_args() {
        assert!(Cli::try_parse_from(["refdesk", "ingest"]).is_err());
        assert!(Cli::try_parse_from(["refdesk", "query"]).is_err());
        assert!(Cli::try_parse_from(["refdesk", "query", "soru"]).is_err());
        assert!(Cli::try_parse_from(["refdesk", "rebuild"]).is_err());
    }

    #[test]
    fn clap_rejects_unknown_subcommands() {
        assert!(Cli::try_parse_from(["refdesk", "optimize"]).is_err());
    }
}
