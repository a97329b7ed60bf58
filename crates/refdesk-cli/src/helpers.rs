//! Shared plumbing: configuration loading and provider resolution.
//!
//! Providers are resolved once, by name, before any work starts. A
//! missing API key is not detected here; the provider reports it on the
//! first call, so cache-only invocations never need credentials.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use refdesk::{ChatModel, DocumentService, Embeddings, ProviderKind, ServiceConfig};
use refdesk_gemini::{GeminiChat, GeminiEmbeddings};
use refdesk_openai::{OpenAiChat, OpenAiEmbeddings};
use tracing::debug;

/// Flags shared by every subcommand that touches the index or cache.
#[derive(Args)]
pub struct ServiceArgs {
    /// TOML configuration file (camelCase keys; every key optional)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Cache directory (overrides the config file)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Skip the disk cache for this invocation
    #[arg(long)]
    pub no_cache: bool,

    /// Embedding and chat provider (gemini, openai; overrides the config file)
    #[arg(short, long)]
    pub provider: Option<String>,
}

impl ServiceArgs {
    /// Loads the config file (or defaults) and applies the flag
    /// overrides on top.
    pub async fn load_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading config file {}", path.display()))?;
                ServiceConfig::from_toml_str(&raw)?
            }
            None => ServiceConfig::default(),
        };

        if let Some(dir) = &self.cache_dir {
            config.cache_dir.clone_from(dir);
        }
        if self.no_cache {
            config.use_cache = false;
        }
        if let Some(name) = &self.provider {
            let kind: ProviderKind = name.parse().unwrap_or_default();
            config.embedding_provider = kind;
            config.chat_provider = kind;
        }

        debug!(
            embedding_provider = %config.embedding_provider,
            chat_provider = %config.chat_provider,
            cache_dir = %config.cache_dir.display(),
            use_cache = config.use_cache,
            "resolved configuration"
        );
        Ok(config)
    }
}

/// Picks the embedding client for a provider name.
pub fn resolve_embeddings(kind: ProviderKind) -> Arc<dyn Embeddings> {
    match kind {
        ProviderKind::Gemini => Arc::new(GeminiEmbeddings::new()),
        ProviderKind::OpenAi => Arc::new(OpenAiEmbeddings::new()),
    }
}

/// Picks the chat client for a provider name.
pub fn resolve_chat(kind: ProviderKind) -> Arc<dyn ChatModel> {
    match kind {
        ProviderKind::Gemini => Arc::new(GeminiChat::new()),
        ProviderKind::OpenAi => Arc::new(OpenAiChat::new()),
    }
}

/// Builds the document service with the embedding provider the config
/// names.
pub fn build_service(config: ServiceConfig) -> Result<DocumentService> {
    let embeddings = resolve_embeddings(config.embedding_provider);
    Ok(DocumentService::new(config, embeddings)?)
}
