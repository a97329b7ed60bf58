//! Deterministic embeddings providers for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use refdesk::error::Result;
use refdesk::Embeddings;

/// Byte-derived embeddings: no network, no keys, stable across runs.
///
/// Each text maps to a unit vector computed from its leading bytes and
/// length. The vectors carry no semantic meaning, so tests that depend
/// on exact similarity rankings should use [`PlannedEmbeddings`]
/// instead.
///
/// Call counters make provider traffic observable: a service that warm
/// starts from a cache must leave [`MockEmbeddings::document_calls`] at
/// zero.
#[derive(Debug)]
pub struct MockEmbeddings {
    dimensions: usize,
    model: String,
    document_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl MockEmbeddings {
    /// Creates a provider generating 3-dimensional vectors.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimensions(3)
    }

    /// Creates a provider generating vectors of the given dimension.
    ///
    /// The dimension is part of the reported model name, so a cache
    /// built at one dimension does not validate against a store opened
    /// at another.
    #[must_use]
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            model: format!("mock-embeddings-{dimensions}d"),
            document_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_documents` calls so far.
    #[must_use]
    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    /// Number of `embed_query` calls so far.
    #[must_use]
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn generate_vector(&self, text: &str) -> Vec<f32> {
        let bytes = text.as_bytes();
        let x = bytes.first().map_or(0.0, |b| f32::from(*b) / 255.0);
        let y = if bytes.len() < 2 {
            0.0
        } else {
            f32::from(bytes[1]) / 255.0
        };
        let z = (text.len() as f32 / 100.0).min(1.0);

        let mut vector = vec![x, y, z];
        if self.dimensions > 3 {
            for i in 3..self.dimensions {
                let byte_index = i % bytes.len().max(1);
                let byte_val = bytes
                    .get(byte_index)
                    .copied()
                    .unwrap_or((i as u8).wrapping_mul(37));
                vector.push((f32::from(byte_val) / 255.0 + i as f32 / self.dimensions as f32) / 2.0);
            }
        } else {
            vector.truncate(self.dimensions);
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter().map(|v| v / norm).collect()
        } else {
            // All-zero input (e.g. the empty string at low dimensions)
            // still gets a unit vector.
            vec![1.0 / (self.dimensions as f32).sqrt(); self.dimensions]
        }
    }
}

impl Default for MockEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embeddings for MockEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.generate_vector(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.generate_vector(text))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted embeddings: each known text maps to a fixed vector, unknown
/// texts map to the zero vector.
///
/// The zero vector has cosine 0.0 against everything, so an unknown
/// query falls below any positive score floor. That makes the
/// no-relevant-information path reachable in tests without a real
/// provider.
pub struct PlannedEmbeddings {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl PlannedEmbeddings {
    /// Creates a provider from `(text, vector)` pairs.
    #[must_use]
    pub fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
        let dimension = pairs.first().map_or(2, |(_, v)| v.len());
        Self {
            vectors: pairs
                .iter()
                .map(|(t, v)| ((*t).to_string(), v.clone()))
                .collect(),
            dimension,
        }
    }

    fn lookup(&self, text: &str) -> Vec<f32> {
        self.vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension])
    }
}

#[async_trait]
impl Embeddings for PlannedEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.lookup(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.lookup(text))
    }

    fn provider_name(&self) -> &str {
        "planned"
    }

    fn model_name(&self) -> &str {
        "planned-test"
    }
}
