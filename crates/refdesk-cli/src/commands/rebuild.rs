//! `refdesk rebuild` - re-ingest from the source files and rewrite the
//! cache, ignoring whatever is on disk.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::helpers::{build_service, ServiceArgs};
use crate::output::print_ingest_report;

/// Re-ingest a directory, bypassing and rewriting the cache
#[derive(Args)]
pub struct RebuildArgs {
    /// Directory containing the source documents (scanned non-recursively)
    pub dir: PathBuf,

    #[command(flatten)]
    pub service: ServiceArgs,
}

pub async fn run(args: RebuildArgs) -> Result<()> {
    let config = args.service.load_config().await?;
    let service = build_service(config)?;

    let report = service.rebuild(&args.dir).await?;
    print_ingest_report(&report);
    Ok(())
}
