//! Service configuration and provider selection.
//!
//! All keys serialize camelCase (the same spelling the assistant's tool
//! layer passes in its options object) and every field has a default, so
//! a partial TOML file (or none at all) is valid.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::retrieval::RetrievalOptions;
use crate::splitter::SplitterConfig;

/// Default chunk size in characters for prose sources.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default chunk overlap in characters for prose sources.
pub const DEFAULT_CHUNK_OVERLAP: usize = 300;

/// Default number of documents embedded per batch.
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Default pause between embedding batches, in milliseconds.
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 1000;

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "vector_cache";

/// Embedding/chat vendor selected by name.
///
/// Unknown names fall back to [`ProviderKind::Gemini`] with a warning
/// instead of failing: a misspelled provider in a config file degrades
/// to the default vendor rather than taking the assistant down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini.
    #[default]
    Gemini,
    /// OpenAI.
    OpenAi,
}

impl ProviderKind {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => ProviderKind::Gemini,
            "openai" => ProviderKind::OpenAi,
            other => {
                warn!(provider = other, "unknown provider name, using gemini");
                ProviderKind::Gemini
            }
        })
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

/// Everything the ingestion/retrieval service needs to know, with the
/// production defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    /// Maximum chunk length in characters for prose sources.
    pub chunk_size: usize,
    /// Characters of overlap carried between consecutive chunks.
    pub chunk_overlap: usize,
    /// Documents embedded per provider call.
    pub batch_size: usize,
    /// Pause between consecutive embedding batches, in milliseconds.
    /// Backpressure toward the provider's rate limits.
    pub batch_pause_ms: u64,
    /// Whether to load a valid cache instead of re-ingesting.
    pub use_cache: bool,
    /// Directory holding the three cache artifacts.
    pub cache_dir: PathBuf,
    /// Vendor used for embeddings.
    pub embedding_provider: ProviderKind,
    /// Vendor used for answer composition.
    pub chat_provider: ProviderKind,
    /// Explicit source files to ingest. Usually left empty in favor of a
    /// directory scan.
    pub source_files: Vec<PathBuf>,
    /// Retrieval pipeline tuning.
    pub retrieval: RetrievalOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause_ms: DEFAULT_BATCH_PAUSE_MS,
            use_cache: true,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            embedding_provider: ProviderKind::default(),
            chat_provider: ProviderKind::default(),
            source_files: Vec::new(),
            retrieval: RetrievalOptions::default(),
        }
    }
}

impl ServiceConfig {
    /// Parses a TOML document. Unknown keys are ignored; missing keys
    /// take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| Error::Configuration(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Configuration(
                "batchSize must be at least 1".to_string(),
            ));
        }
        self.splitter_config().validate()
    }

    /// Chunking parameters for prose sources.
    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig::new(self.chunk_size, self.chunk_overlap)
    }

    /// The inter-batch pause as a [`Duration`].
    #[must_use]
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}
