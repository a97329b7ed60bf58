//! In-memory vector index with exact cosine ranking.
//!
//! The corpus for a single assistant instance is small (thousands of
//! chunks, not millions), so a brute-force scan over a `Vec` of records
//! beats an ANN structure: exact scores, insertion-order determinism, and
//! a trivially serializable shape for the persistence layer.
//!
//! The store is bound to one embedding provider at construction. Records
//! loaded from disk must come from the same provider and model; the
//! persistence layer enforces that before calling [`InMemoryVectorStore::add_precomputed`].

use std::fmt;
use std::sync::Arc;

use crate::documents::Document;
use crate::embeddings::Embeddings;
use crate::error::{Error, Result};

/// Default candidate pool size for maximal-marginal-relevance search.
pub const DEFAULT_MMR_FETCH_K: usize = 20;

/// Default relevance/diversity balance for maximal-marginal-relevance
/// search. 1.0 is pure relevance, 0.0 pure diversity.
pub const DEFAULT_MMR_LAMBDA: f32 = 0.5;

/// One indexed document together with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    /// The document as it will be returned from search.
    pub document: Document,
    /// The document's embedding vector.
    pub embedding: Vec<f32>,
}

/// Exact-search vector store over an in-memory record list.
///
/// Scores are raw cosine similarities in `[-1, 1]`; callers filter
/// against thresholds on that scale. Ranking ties keep insertion order.
pub struct InMemoryVectorStore {
    records: Vec<MemoryRecord>,
    embeddings: Arc<dyn Embeddings>,
}

impl fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .field("records", &self.records.len())
            .field("provider", &self.embeddings.provider_name())
            .field("model", &self.embeddings.model_name())
            .finish()
    }
}

impl InMemoryVectorStore {
    /// Creates an empty store bound to the given embedding provider.
    #[must_use]
    pub fn new(embeddings: Arc<dyn Embeddings>) -> Self {
        Self {
            records: Vec::new(),
            embeddings,
        }
    }

    /// Provider identity the store's vectors were produced by.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.embeddings.provider_name()
    }

    /// Model identity the store's vectors were produced by.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.embeddings.model_name()
    }

    /// Number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Indexed records in insertion order. The persistence layer reads
    /// these to serialize vectors alongside their documents.
    #[must_use]
    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    /// Snapshot of all indexed documents in insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.records.iter().map(|r| r.document.clone()).collect()
    }

    /// Drops every record. The provider binding is unchanged.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Embeds the documents with the bound provider and appends them.
    /// Returns the number of records added.
    pub async fn add_documents(&mut self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let vectors = self.embeddings.embed_documents(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(Error::Provider(format!(
                "embedding count mismatch: sent {} texts, received {} vectors",
                documents.len(),
                vectors.len()
            )));
        }

        let added = documents.len();
        for (document, embedding) in documents.into_iter().zip(vectors) {
            self.ensure_dimension(embedding.len())
                .map_err(Error::Provider)?;
            self.records.push(MemoryRecord {
                document,
                embedding,
            });
        }
        Ok(added)
    }

    /// Appends documents with embeddings computed elsewhere. This is the
    /// cache-load path: vectors deserialized from disk are rebound without
    /// re-embedding.
    pub fn add_precomputed(
        &mut self,
        documents: Vec<Document>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        if documents.len() != embeddings.len() {
            return Err(Error::Persistence(format!(
                "document/vector count mismatch: {} documents, {} vectors",
                documents.len(),
                embeddings.len()
            )));
        }
        let added = documents.len();
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            self.ensure_dimension(embedding.len())
                .map_err(Error::Persistence)?;
            self.records.push(MemoryRecord {
                document,
                embedding,
            });
        }
        Ok(added)
    }

    /// Top-`k` documents by cosine similarity to the query.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let scored = self.similarity_search_with_score(query, k).await?;
        Ok(scored.into_iter().map(|(doc, _score)| doc).collect())
    }

    /// Top-`k` documents with their raw cosine scores, best first.
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>> {
        if k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = self.embeddings.embed_query(query).await?;
        Ok(self
            .ranked_indices(&query_embedding)
            .into_iter()
            .take(k)
            .map(|(i, score)| (self.records[i].document.clone(), score))
            .collect())
    }

    /// Top-`k` documents by similarity to a caller-supplied vector.
    #[must_use]
    pub fn similarity_search_by_vector(&self, embedding: &[f32], k: usize) -> Vec<(Document, f32)> {
        self.ranked_indices(embedding)
            .into_iter()
            .take(k)
            .map(|(i, score)| (self.records[i].document.clone(), score))
            .collect()
    }

    /// Maximal-marginal-relevance search: picks `k` documents from the
    /// `fetch_k` most similar candidates, trading query relevance against
    /// redundancy with already-picked documents.
    pub async fn max_marginal_relevance_search(
        &self,
        query: &str,
        k: usize,
        fetch_k: usize,
        lambda: f32,
    ) -> Result<Vec<Document>> {
        if !(0.0..=1.0).contains(&lambda) {
            return Err(Error::Configuration(format!(
                "mmr lambda must be within [0, 1], got {lambda}"
            )));
        }
        if k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = self.embeddings.embed_query(query).await?;

        let candidates: Vec<(usize, f32)> = self
            .ranked_indices(&query_embedding)
            .into_iter()
            .take(fetch_k.max(k))
            .collect();

        let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
        let mut remaining: Vec<(usize, f32)> = candidates;
        while selected.len() < k && !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (pos, &(idx, query_sim)) in remaining.iter().enumerate() {
                let redundancy = selected
                    .iter()
                    .map(|&s| {
                        cosine_similarity(&self.records[idx].embedding, &self.records[s].embedding)
                    })
                    .fold(f32::NEG_INFINITY, f32::max);
                let redundancy = if redundancy.is_finite() { redundancy } else { 0.0 };
                let score = lambda * query_sim - (1.0 - lambda) * redundancy;
                if score > best_score {
                    best_score = score;
                    best_pos = pos;
                }
            }
            let (idx, _) = remaining.remove(best_pos);
            selected.push(idx);
        }

        Ok(selected
            .into_iter()
            .map(|i| self.records[i].document.clone())
            .collect())
    }

    /// All record indices scored against `query_embedding`, sorted best
    /// first. The sort is stable, so equal scores keep insertion order.
    fn ranked_indices(&self, query_embedding: &[f32]) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (i, cosine_similarity(query_embedding, &record.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }

    fn ensure_dimension(&self, len: usize) -> std::result::Result<(), String> {
        match self.records.first() {
            Some(first) if first.embedding.len() != len => Err(format!(
                "embedding dimension mismatch: store holds {}-dimensional vectors, got {}",
                first.embedding.len(),
                len
            )),
            _ => Ok(()),
        }
    }
}

/// Cosine similarity of two vectors. Returns 0.0 for mismatched lengths
/// or zero-norm inputs rather than propagating NaN into rankings.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Deterministic embeddings: each known text maps to a fixed vector.
    struct PlannedEmbeddings {
        vectors: HashMap<String, Vec<f32>>,
        dimension: usize,
    }

    impl PlannedEmbeddings {
        fn new(pairs: &[(&str, Vec<f32>)]) -> Arc<Self> {
            let dimension = pairs.first().map_or(3, |(_, v)| v.len());
            Arc::new(Self {
                vectors: pairs
                    .iter()
                    .map(|(t, v)| ((*t).to_string(), v.clone()))
                    .collect(),
                dimension,
            })
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

    fn doc(text: &str) -> Document {
        Document::new(text)
    }

    fn approx(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "expected {b}, got {a}");
    }

    // ==== cosine ====

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        approx(cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        approx(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_of_opposed_vectors_is_negative_one() {
        approx(cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]), -1.0);
    }

    #[test]
    fn cosine_guards_against_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    // ==== add / search ====

    #[tokio::test]
    async fn add_documents_embeds_and_counts() {
        let embeddings = PlannedEmbeddings::new(&[
            ("a", vec![1.0, 0.0, 0.0]),
            ("b", vec![0.0, 1.0, 0.0]),
        ]);
        let mut store = InMemoryVectorStore::new(embeddings);
        let added = store
            .add_documents(vec![doc("a"), doc("b")])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn adding_nothing_is_a_no_op() {
        let embeddings = PlannedEmbeddings::new(&[]);
        let mut store = InMemoryVectorStore::new(embeddings);
        assert_eq!(store.add_documents(Vec::new()).await.unwrap(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_descending() {
        let embeddings = PlannedEmbeddings::new(&[
            ("uzak", vec![0.0, 1.0, 0.0]),
            ("yakın", vec![0.8, 0.6, 0.0]),
            ("tam", vec![1.0, 0.0, 0.0]),
            ("sorgu", vec![1.0, 0.0, 0.0]),
        ]);
        let mut store = InMemoryVectorStore::new(embeddings);
        store
            .add_documents(vec![doc("uzak"), doc("yakın"), doc("tam")])
            .await
            .unwrap();

        let results = store.similarity_search_with_score("sorgu", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0.page_content, "tam");
        approx(results[0].1, 1.0);
        assert_eq!(results[1].0.page_content, "yakın");
        approx(results[1].1, 0.8);
        assert_eq!(results[2].0.page_content, "uzak");
        approx(results[2].1, 0.0);
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let embeddings = PlannedEmbeddings::new(&[
            ("birinci", vec![1.0, 0.0]),
            ("ikinci", vec![1.0, 0.0]),
            ("sorgu", vec![1.0, 0.0]),
        ]);
        let mut store = InMemoryVectorStore::new(embeddings);
        store
            .add_documents(vec![doc("birinci"), doc("ikinci")])
            .await
            .unwrap();

        let results = store.similarity_search("sorgu", 2).await.unwrap();
        assert_eq!(results[0].page_content, "birinci");
        assert_eq!(results[1].page_content, "ikinci");
    }

    #[tokio::test]
    async fn k_bounds_are_respected() {
        let embeddings = PlannedEmbeddings::new(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
        ]);
        let mut store = InMemoryVectorStore::new(embeddings);
        store.add_documents(vec![doc("a"), doc("b")]).await.unwrap();

        assert_eq!(store.similarity_search("a", 0).await.unwrap().len(), 0);
        assert_eq!(store.similarity_search("a", 1).await.unwrap().len(), 1);
        assert_eq!(store.similarity_search("a", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_store_returns_no_results() {
        let embeddings = PlannedEmbeddings::new(&[]);
        let store = InMemoryVectorStore::new(embeddings);
        assert!(store.similarity_search("her şey", 5).await.unwrap().is_empty());
    }

    #[test]
    fn search_by_vector_skips_the_provider() {
        let embeddings = PlannedEmbeddings::new(&[("a", vec![1.0, 0.0])]);
        let mut store = InMemoryVectorStore::new(embeddings);
        store
            .add_precomputed(vec![doc("a")], vec![vec![1.0, 0.0]])
            .unwrap();

        let results = store.similarity_search_by_vector(&[1.0, 0.0], 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.page_content, "a");
    }

    // ==== precomputed / dimensions ====

    #[test]
    fn precomputed_vectors_are_rebound_without_embedding() {
        let embeddings = PlannedEmbeddings::new(&[]);
        let mut store = InMemoryVectorStore::new(embeddings);
        let added = store
            .add_precomputed(
                vec![doc("kayıt")],
                vec![vec![0.5, 0.5, 0.0]],
            )
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.records()[0].embedding, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn precomputed_count_mismatch_is_a_persistence_error() {
        let embeddings = PlannedEmbeddings::new(&[]);
        let mut store = InMemoryVectorStore::new(embeddings);
        let err = store
            .add_precomputed(vec![doc("a"), doc("b")], vec![vec![1.0]])
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn precomputed_dimension_mismatch_is_rejected() {
        let embeddings = PlannedEmbeddings::new(&[]);
        let mut store = InMemoryVectorStore::new(embeddings);
        store
            .add_precomputed(vec![doc("a")], vec![vec![1.0, 0.0]])
            .unwrap();
        let err = store
            .add_precomputed(vec![doc("b")], vec![vec![1.0, 0.0, 0.0]])
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(ref m) if m.contains("dimension")));
    }

    // ==== mmr ====

    #[tokio::test]
    async fn mmr_prefers_diverse_results() {
        // "x" and "x2" point the same way; "y" is orthogonal. Pure
        // similarity would return [x, x2]; MMR should swap in "y".
        let embeddings = PlannedEmbeddings::new(&[
            ("x", vec![1.0, 0.0, 0.0]),
            ("x2", vec![0.96, 0.28, 0.0]),
            ("y", vec![0.0, 1.0, 0.0]),
            ("sorgu", vec![1.0, 0.1, 0.0]),
        ]);
        let mut store = InMemoryVectorStore::new(embeddings);
        store
            .add_documents(vec![doc("x"), doc("x2"), doc("y")])
            .await
            .unwrap();

        let diverse = store
            .max_marginal_relevance_search("sorgu", 2, 3, DEFAULT_MMR_LAMBDA)
            .await
            .unwrap();
        assert_eq!(diverse[0].page_content, "x");
        assert_eq!(diverse[1].page_content, "y");

        let relevant_only = store
            .max_marginal_relevance_search("sorgu", 2, 3, 1.0)
            .await
            .unwrap();
        assert_eq!(relevant_only[0].page_content, "x");
        assert_eq!(relevant_only[1].page_content, "x2");
    }

    #[tokio::test]
    async fn mmr_rejects_out_of_range_lambda() {
        let embeddings = PlannedEmbeddings::new(&[]);
        let store = InMemoryVectorStore::new(embeddings);
        let err = store
            .max_marginal_relevance_search("sorgu", 2, 3, 1.5)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    // ==== snapshots / identity ====

    #[tokio::test]
    async fn documents_snapshot_preserves_insertion_order() {
        let embeddings = PlannedEmbeddings::new(&[
            ("ilk", vec![1.0, 0.0]),
            ("son", vec![0.0, 1.0]),
        ]);
        let mut store = InMemoryVectorStore::new(embeddings);
        store
            .add_documents(vec![doc("ilk"), doc("son")])
            .await
            .unwrap();

        let docs = store.documents();
        assert_eq!(docs[0].page_content, "ilk");
        assert_eq!(docs[1].page_content, "son");

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.provider_name(), "planned");
        assert_eq!(store.model_name(), "planned-test");
    }
}
