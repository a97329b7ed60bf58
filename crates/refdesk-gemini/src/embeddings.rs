//! Gemini embeddings over the Generative Language REST API.
//!
//! Documents go through `models/{model}:batchEmbedContents` in slices of
//! at most 100 texts (the API's per-request limit); single queries use
//! `models/{model}:embedContent`. Unless overridden, documents are
//! embedded with the `RETRIEVAL_DOCUMENT` task type and queries with
//! `RETRIEVAL_QUERY`, which is what Gemini recommends for search
//! workloads.

use async_trait::async_trait;
use refdesk::error::{Error, Result};
use refdesk::Embeddings;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{api_key_from_env, missing_key_error, API_BASE, PROVIDER_NAME};

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";

/// Hard per-request limit of the `batchEmbedContents` endpoint.
const MAX_BATCH: usize = 100;

/// Embedding task type, passed through to the API verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// No task-specific tuning.
    TaskTypeUnspecified,
    /// Search query text.
    RetrievalQuery,
    /// Corpus text that queries will be matched against.
    RetrievalDocument,
    /// Text compared for semantic similarity.
    SemanticSimilarity,
    /// Text to be classified.
    Classification,
    /// Text to be clustered.
    Clustering,
    /// Question-answering input.
    QuestionAnswering,
    /// Fact-verification input.
    FactVerification,
}

/// [`Embeddings`] implementation backed by Gemini embedding models.
///
/// The API key is read from `GEMINI_API_KEY` (falling back to
/// `GOOGLE_API_KEY`) or set explicitly with
/// [`GeminiEmbeddings::with_api_key`]. A missing key only fails at
/// request time.
pub struct GeminiEmbeddings {
    api_key: Option<String>,
    model: String,
    api_base: String,
    client: Client,
    /// Overrides the per-call retrieval task types when set.
    task_type: Option<TaskType>,
    output_dimensionality: Option<u32>,
}

impl GeminiEmbeddings {
    /// Creates a client with the default model and the API key from the
    /// environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: api_key_from_env(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_base: API_BASE.to_string(),
            client: Client::new(),
            task_type: None,
            output_dimensionality: None,
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
        self.api_base = api_base.into();
        self
    }

    /// Forces one task type for both documents and queries.
    #[must_use]
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    /// Requests truncated output vectors of the given dimension.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.output_dimensionality = Some(dimensions);
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(missing_key_error)
    }

    fn request_for(&self, text: &str, fallback: TaskType) -> EmbedContentRequest {
        EmbedContentRequest {
            content: WireContent {
                parts: vec![WirePart {
                    text: text.to_string(),
                }],
            },
            task_type: Some(self.task_type.unwrap_or(fallback)),
            output_dimensionality: self.output_dimensionality,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.api_base,
            self.model,
            self.api_key()?
        );
        let request = BatchEmbedContentsRequest {
            requests: texts
                .iter()
                .map(|t| self.request_for(t, TaskType::RetrievalDocument))
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("gemini embedding request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Provider(format!("gemini embedding error: {e}")))?;
        let parsed: BatchEmbedContentsResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("unparseable gemini embedding response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(Error::Provider(format!(
                "gemini returned {} embeddings for {} texts",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

impl Default for GeminiEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embeddings for GeminiEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut all = Vec::with_capacity(texts.len());
        for slice in texts.chunks(MAX_BATCH) {
            all.extend(self.embed_batch(slice).await?);
        }
        Ok(all)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.api_base,
            self.model,
            self.api_key()?
        );
        let request = self.request_for(text, TaskType::RetrievalQuery);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("gemini embedding request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Provider(format!("gemini embedding error: {e}")))?;
        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("unparseable gemini embedding response: {e}")))?;
        Ok(parsed.embedding.values)
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Wire types for the embedContent/batchEmbedContents endpoints.

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    content: WireContent,
    #[serde(rename = "taskType", skip_serializing_if = "Option::is_none")]
    task_type: Option<TaskType>,
    #[serde(
        rename = "outputDimensionality",
        skip_serializing_if = "Option::is_none"
    )]
    output_dimensionality: Option<u32>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedContentsRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Serialize)]
struct WireContent {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WirePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
