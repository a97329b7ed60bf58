//! `refdesk query` - answer a question grounded in the indexed
//! documents.
//!
//! Builds or cache-loads the index first, retrieves context for the
//! question, and composes a grounded reply. Only the answer goes to
//! stdout; ingestion progress stays on stderr.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use refdesk::AnswerComposer;

use crate::helpers::{build_service, resolve_chat, ServiceArgs};
use crate::output::{print_warning, OutputFormat};

/// Ask a question grounded in the indexed documents
#[derive(Args)]
pub struct QueryArgs {
    /// The question to answer
    pub question: String,

    /// Directory containing the source documents
    #[arg(short, long)]
    pub dir: PathBuf,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub async fn run(args: QueryArgs) -> Result<()> {
    let config = args.service.load_config().await?;
    let chat = resolve_chat(config.chat_provider);
    let service = build_service(config)?;

    let report = service.ingest_directory(&args.dir).await?;
    for (path, reason) in &report.files_failed {
        print_warning(&format!("skipped {}: {reason}", path.display()));
    }

    let outcome = service.search(&args.question).await?;
    let composer = AnswerComposer::new(chat);
    let answer = composer.compose(&args.question, &outcome).await?;

    match args.format {
        OutputFormat::Text => println!("{}", answer.text),
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "question": args.question,
                "answer": answer.text,
                "sources": answer.sources,
                "usage": answer.usage,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}
