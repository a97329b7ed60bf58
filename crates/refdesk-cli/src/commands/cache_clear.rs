//! `refdesk cache-clear` - delete the on-disk cache artifacts.
//!
//! Removes the three artifacts plus any leftover staging files. The
//! next `ingest` will re-embed everything.

use anyhow::Result;
use clap::Args;

use refdesk::VectorStorePersistence;

use crate::helpers::ServiceArgs;
use crate::output::{print_info, print_success};

/// Delete the on-disk cache artifacts
#[derive(Args)]
pub struct CacheClearArgs {
    #[command(flatten)]
    pub service: ServiceArgs,
}

pub async fn run(args: CacheClearArgs) -> Result<()> {
    let config = args.service.load_config().await?;
    let persistence = VectorStorePersistence::new(&config.cache_dir);
    let removed = persistence.clear().await?;

    if removed == 0 {
        print_info(&format!(
            "no cache artifacts under {}",
            config.cache_dir.display()
        ));
    } else {
        print_success(&format!(
            "removed {removed} cache artifact(s) from {}",
            config.cache_dir.display()
        ));
    }
    Ok(())
}
