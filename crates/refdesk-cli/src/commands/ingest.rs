//! `refdesk ingest` - build the index for a documents directory.
//!
//! Cache-aware: a valid cache restores the index without calling the
//! embedding provider. Pass `--no-cache` to force a fresh run, or use
//! `refdesk rebuild` to also rewrite the cache.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::helpers::{build_service, ServiceArgs};
use crate::output::print_ingest_report;

/// Build the document index for a directory
#[derive(Args)]
pub struct IngestArgs {
    /// Directory containing the source documents (scanned non-recursively)
    pub dir: PathBuf,

    #[command(flatten)]
    pub service: ServiceArgs,
}

pub async fn run(args: IngestArgs) -> Result<()> {
    let config = args.service.load_config().await?;
    let service = build_service(config)?;

    let report = service.ingest_directory(&args.dir).await?;
    print_ingest_report(&report);
    Ok(())
}
