//! Embedding provider interface.
//!
//! Providers convert batches of text into fixed-dimension vectors. All
//! vectors in one index must come from the same provider and model; the
//! cache manifest records both and the persistence layer refuses to rebind
//! a cache to a different provider. Implementations live in the provider
//! crates (`refdesk-gemini`, `refdesk-openai`) and in
//! `refdesk-test-utils::MockEmbeddings` for tests.

use async_trait::async_trait;

use crate::error::Result;

/// Interface for embedding models.
///
/// Implementations are expected to be cheap to clone behind an `Arc` and
/// safe to call concurrently; any internal batching or rate limiting is
/// the provider's concern. Callers batch at the ingestion level (see
/// [`crate::service::DocumentService`]).
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embeds a batch of document texts, one vector per input, in order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embeds a single query string.
    ///
    /// Kept separate from [`Embeddings::embed_documents`] because some
    /// providers use distinct task types for queries and documents.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Short provider name recorded in the cache manifest
    /// (`"gemini"`, `"openai"`, `"mock"`).
    fn provider_name(&self) -> &str;

    /// Model identifier recorded in the cache manifest.
    fn model_name(&self) -> &str;
}
