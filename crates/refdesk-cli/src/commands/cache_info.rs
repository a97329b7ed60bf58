//! `refdesk cache-info` - describe the on-disk cache artifacts.
//!
//! Reads only; never needs provider credentials. Reports whether the
//! artifact set is complete and what the manifest recorded, without
//! judging validity against any source directory.

use anyhow::Result;
use clap::Args;

use refdesk::VectorStorePersistence;

use crate::helpers::ServiceArgs;
use crate::output::{format_bytes, print_info, OutputFormat};

/// Describe the on-disk cache artifacts
#[derive(Args)]
pub struct CacheInfoArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub async fn run(args: CacheInfoArgs) -> Result<()> {
    let config = args.service.load_config().await?;
    let persistence = VectorStorePersistence::new(&config.cache_dir);
    let info = persistence.info().await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Text => {
            println!("cache directory: {}", config.cache_dir.display());
            if !info.exists {
                print_info("no cache directory on disk");
                return Ok(());
            }
            println!(
                "artifacts:       {}",
                if info.complete { "complete" } else { "incomplete" }
            );
            for (name, size) in &info.artifact_sizes {
                println!("  {name:<16} {}", format_bytes(*size));
            }
            if let Some(manifest) = &info.manifest {
                println!("provider:        {}", manifest.embedding_provider);
                println!("model:           {}", manifest.embedding_model);
                println!("documents:       {}", manifest.total_documents);
                println!("created:         {}", manifest.created_at);
                println!("source files:    {}", manifest.source_files.len());
            }
        }
    }
    Ok(())
}
