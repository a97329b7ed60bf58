//! OpenAI embeddings over the `/embeddings` endpoint.
//!
//! Documents are sent in slices of at most 512 texts per request and the
//! response rows are re-sorted by index, so callers always get one vector
//! per input in input order.

use async_openai::types::{CreateEmbeddingRequest, EmbeddingInput};
use async_trait::async_trait;
use refdesk::error::{Error, Result};
use refdesk::Embeddings;

use crate::{api_key_from_env, build_client, missing_key_error, PROVIDER_NAME};

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Texts per request.
const MAX_BATCH: usize = 512;

/// [`Embeddings`] implementation backed by OpenAI embedding models.
///
/// The API key is read from `OPENAI_API_KEY` or set explicitly with
/// [`OpenAiEmbeddings::with_api_key`]. A missing key only fails at
/// request time.
pub struct OpenAiEmbeddings {
    api_key: Option<String>,
    model: String,
    /// `None` means the production endpoint.
    api_base: Option<String>,
    dimensions: Option<u32>,
}

impl OpenAiEmbeddings {
    /// Creates a client with the default model and the API key from the
    /// environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: api_key_from_env(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_base: None,
            dimensions: None,
        }
    }

    /// Sets the API key explicitly.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Selects the embedding model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the API base URL. Intended for tests and proxies.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Requests truncated output vectors (text-embedding-3 models only).
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn client(&self) -> Result<async_openai::Client<async_openai::config::OpenAIConfig>> {
        let key = self.api_key.as_deref().ok_or_else(missing_key_error)?;
        Ok(build_client(key, self.api_base.as_deref()))
    }
}

impl Default for OpenAiEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embeddings for OpenAiEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client()?;

        let mut all = Vec::with_capacity(texts.len());
        for slice in texts.chunks(MAX_BATCH) {
            let request = CreateEmbeddingRequest {
                model: self.model.clone(),
                input: EmbeddingInput::StringArray(slice.to_vec()),
                encoding_format: None,
                dimensions: self.dimensions,
                user: None,
            };
            let response = client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| Error::Provider(format!("openai embedding request failed: {e}")))?;

            // Row order is not guaranteed by the API.
            let mut rows = response.data;
            rows.sort_by_key(|row| row.index);
            if rows.len() != slice.len() {
                return Err(Error::Provider(format!(
                    "openai returned {} embeddings for {} texts",
                    rows.len(),
                    slice.len()
                )));
            }
            all.extend(rows.into_iter().map(|row| row.embedding));
        }
        Ok(all)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Provider("openai returned no embedding".to_string()))
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
