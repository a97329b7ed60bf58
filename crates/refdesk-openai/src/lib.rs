//! OpenAI backends for refdesk.
//!
//! Implements the [`refdesk::Embeddings`] and [`refdesk::ChatModel`]
//! traits over the `async-openai` client:
//!
//! - [`OpenAiEmbeddings`]: `/embeddings`, default model
//!   `text-embedding-3-small`
//! - [`OpenAiChat`]: `/chat/completions`, default model `gpt-4o-mini`
//!   at temperature 0
//!
//! # Authentication
//!
//! Both clients read `OPENAI_API_KEY` at construction time;
//! [`OpenAiEmbeddings::with_api_key`] and [`OpenAiChat::with_api_key`]
//! override the environment. A missing key surfaces as a configuration
//! error on the first request, not at construction.
//!
//! # Example
//!
//! ```no_run
//! use refdesk::Embeddings;
//! use refdesk_openai::OpenAiEmbeddings;
//!
//! # async fn example() -> refdesk::Result<()> {
//! let embedder = OpenAiEmbeddings::new().with_api_key("anahtar");
//! let vector = embedder.embed_query("Ödünç süresi ne kadar?").await?;
//! assert!(!vector.is_empty());
//! # Ok(())
//! # }
//! ```

use async_openai::config::OpenAIConfig;
use async_openai::Client;
use refdesk::error::Error;

pub mod chat;
pub mod embeddings;

pub use chat::{OpenAiChat, DEFAULT_CHAT_MODEL};
pub use embeddings::{OpenAiEmbeddings, DEFAULT_EMBEDDING_MODEL};

/// Provider name recorded in cache manifests.
pub const PROVIDER_NAME: &str = "openai";

/// Environment variable holding the API key.
const ENV_VAR: &str = "OPENAI_API_KEY";

pub(crate) fn api_key_from_env() -> Option<String> {
    std::env::var(ENV_VAR).ok().filter(|key| !key.is_empty())
}

pub(crate) fn missing_key_error() -> Error {
    Error::Configuration(
        "OpenAI API key not set; export OPENAI_API_KEY or pass with_api_key()".to_string(),
    )
}

/// Builds a request client for the given key, pointed at the production
/// API unless a base override is set.
pub(crate) fn build_client(api_key: &str, api_base: Option<&str>) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }
    Client::with_config(config)
}
