//! Google Gemini backends for refdesk.
//!
//! Implements the [`refdesk::Embeddings`] and [`refdesk::ChatModel`]
//! traits over the Generative Language REST API:
//!
//! - [`GeminiEmbeddings`]: `embedContent` / `batchEmbedContents`, default
//!   model `gemini-embedding-001`
//! - [`GeminiChat`]: `generateContent`, default model `gemini-2.5-flash`
//!   at temperature 0
//!
//! # Authentication
//!
//! Both clients read `GEMINI_API_KEY` (or, failing that, `GOOGLE_API_KEY`)
//! at construction time; [`GeminiEmbeddings::with_api_key`] and
//! [`GeminiChat::with_api_key`] override the environment. A missing key
//! surfaces as a configuration error on the first request, not at
//! construction.
//!
//! # Example
//!
//! ```no_run
//! use refdesk::Embeddings;
//! use refdesk_gemini::GeminiEmbeddings;
//!
//! # async fn example() -> refdesk::Result<()> {
//! let embedder = GeminiEmbeddings::new().with_api_key("anahtar");
//! let vector = embedder.embed_query("Ödünç süresi ne kadar?").await?;
//! assert!(!vector.is_empty());
//! # Ok(())
//! # }
//! ```

use refdesk::error::Error;

pub mod chat;
pub mod embeddings;

pub use chat::{GeminiChat, DEFAULT_CHAT_MODEL};
pub use embeddings::{GeminiEmbeddings, TaskType, DEFAULT_EMBEDDING_MODEL};

/// Provider name recorded in cache manifests.
pub const PROVIDER_NAME: &str = "gemini";

/// Production REST endpoint base.
pub const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Primary and fallback environment variables for the API key.
const ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

pub(crate) fn api_key_from_env() -> Option<String> {
    ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|key| !key.is_empty()))
}

pub(crate) fn missing_key_error() -> Error {
    Error::Configuration(
        "Gemini API key not set; export GEMINI_API_KEY or pass with_api_key()".to_string(),
    )
}
