//! Hybrid retrieval over the vector index and a BM25 lexical index.
//!
//! Queries run through a tiered pipeline:
//!
//! 1. a weighted ensemble of vector similarity search and lexical search,
//!    fused with reciprocal rank scores;
//! 2. lexical search alone, when the ensemble yields nothing (this is the
//!    path that keeps answers flowing while the embedding provider is
//!    down);
//! 3. a wider similarity search filtered by a minimum cosine score.
//!
//! A tier is consulted only when every tier before it produced no
//! documents. When all tiers come up empty the caller receives
//! [`RetrievalOutcome::NoRelevantInformation`] instead of an empty list,
//! so the answer layer can phrase a deterministic refusal.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bm25::SearchEngineBuilder;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::vector_store::{InMemoryVectorStore, DEFAULT_MMR_FETCH_K, DEFAULT_MMR_LAMBDA};

pub use bm25::Language;

/// Default number of results requested from the vector side.
pub const DEFAULT_K_VEC: usize = 3;

/// Default number of results requested from the lexical side.
pub const DEFAULT_K_LEX: usize = 3;

/// Default cosine-similarity floor. Vector hits scoring below this are
/// dropped rather than returned as the nearest strangers.
pub const DEFAULT_MIN_SCORE: f32 = 0.1;

/// Default ensemble weight for the vector retriever.
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.6;

/// Default ensemble weight for the lexical retriever.
pub const DEFAULT_KEYWORD_WEIGHT: f64 = 0.4;

/// Default rank-smoothing constant for reciprocal rank fusion.
pub const DEFAULT_RRF_C: usize = 60;

/// Lower bound on `k` for the score-filtered similarity fallback; the
/// fallback casts a wider net than the primary vector search.
pub const SCORE_FALLBACK_MIN_K: usize = 10;

/// Strategy used by the vector side of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Plain cosine-similarity ranking.
    #[default]
    Similarity,
    /// Maximal marginal relevance: trades similarity against diversity.
    Mmr,
}

/// Tuning knobs for a retrieval pipeline, with the defaults used by the
/// assistant in production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalOptions {
    /// Results requested from the vector retriever.
    pub k_vec: usize,
    /// Results requested from the lexical retriever.
    pub k_lex: usize,
    /// Cosine floor applied to similarity hits.
    pub min_score: f32,
    /// Vector-side search strategy.
    pub search_type: SearchType,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            k_vec: DEFAULT_K_VEC,
            k_lex: DEFAULT_K_LEX,
            min_score: DEFAULT_MIN_SCORE,
            search_type: SearchType::default(),
        }
    }
}

impl RetrievalOptions {
    /// Sets the vector-side result count, builder style.
    #[must_use]
    pub fn with_k_vec(mut self, k_vec: usize) -> Self {
        self.k_vec = k_vec;
        self
    }

    /// Sets the lexical-side result count, builder style.
    #[must_use]
    pub fn with_k_lex(mut self, k_lex: usize) -> Self {
        self.k_lex = k_lex;
        self
    }

    /// Sets the cosine floor, builder style.
    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Sets the vector-side strategy, builder style.
    #[must_use]
    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }
}

/// A source of ranked documents for a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns documents relevant to `query`, best first. May be empty.
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>>;

    /// Short name used in logs and diagnostics.
    fn name(&self) -> String {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("Retriever")
            .to_string()
    }
}

// ============================================================================
// Vector retriever
// ============================================================================

/// Retriever backed by the in-memory vector store.
///
/// In [`SearchType::Similarity`] mode, hits scoring below `min_score` are
/// dropped so that an off-topic query yields nothing instead of the `k`
/// nearest strangers. MMR mode returns its selection unfiltered; the MMR
/// objective already mixes relevance into every pick.
#[derive(Debug)]
pub struct VectorRetriever {
    store: Arc<RwLock<InMemoryVectorStore>>,
    k: usize,
    search_type: SearchType,
    min_score: f32,
    mmr_fetch_k: usize,
    mmr_lambda: f32,
}

impl VectorRetriever {
    /// Creates a retriever over `store` returning at most `k` documents.
    #[must_use]
    pub fn new(store: Arc<RwLock<InMemoryVectorStore>>, k: usize, search_type: SearchType) -> Self {
        Self {
            store,
            k,
            search_type,
            min_score: DEFAULT_MIN_SCORE,
            mmr_fetch_k: DEFAULT_MMR_FETCH_K,
            mmr_lambda: DEFAULT_MMR_LAMBDA,
        }
    }

    /// Overrides the cosine floor for similarity mode.
    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Overrides the MMR candidate pool size and relevance/diversity
    /// balance.
    #[must_use]
    pub fn with_mmr_params(mut self, fetch_k: usize, lambda: f32) -> Self {
        self.mmr_fetch_k = fetch_k;
        self.mmr_lambda = lambda;
        self
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let store = self.store.read().await;
        match self.search_type {
            SearchType::Similarity => {
                let scored = store.similarity_search_with_score(query, self.k).await?;
                Ok(scored
                    .into_iter()
                    .filter(|(_, score)| *score >= self.min_score)
                    .map(|(doc, _)| doc)
                    .collect())
            }
            SearchType::Mmr => {
                store
                    .max_marginal_relevance_search(query, self.k, self.mmr_fetch_k, self.mmr_lambda)
                    .await
            }
        }
    }
}

// ============================================================================
// Keyword retriever
// ============================================================================

/// BM25 retriever over a corpus snapshot.
///
/// The index covers the full corpus at build time: BM25 scoring needs
/// corpus-wide term statistics, so it cannot be built lazily from top-k
/// vector results. Rebuild it (cheap, in-memory) whenever the corpus
/// changes.
pub struct KeywordRetriever {
    engine: bm25::SearchEngine<u32>,
    documents: Vec<Document>,
    k: usize,
}

impl fmt::Debug for KeywordRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordRetriever")
            .field("documents", &self.documents.len())
            .field("k", &self.k)
            .finish()
    }
}

impl KeywordRetriever {
    /// Builds a Turkish-language index over `documents`, returning at
    /// most `k` results per query.
    pub fn new(documents: Vec<Document>, k: usize) -> Result<Self> {
        Self::with_language(documents, k, Language::Turkish)
    }

    /// Builds an index with explicit tokenizer/stemmer language.
    pub fn with_language(documents: Vec<Document>, k: usize, language: Language) -> Result<Self> {
        if u32::try_from(documents.len()).is_err() {
            return Err(Error::Configuration(format!(
                "lexical corpus too large: {} documents",
                documents.len()
            )));
        }
        let corpus: Vec<bm25::Document<u32>> = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| bm25::Document {
                id: i as u32,
                contents: doc.page_content.clone(),
            })
            .collect();
        let engine = SearchEngineBuilder::<u32>::with_documents(language, corpus).build();
        debug!(documents = documents.len(), "lexical index built");
        Ok(Self {
            engine,
            documents,
            k,
        })
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let hits = self.engine.search(query, self.k);
        Ok(hits
            .into_iter()
            .filter_map(|hit| self.documents.get(hit.document.id as usize).cloned())
            .collect())
    }
}

// ============================================================================
// Ensemble retriever
// ============================================================================

/// Fuses several retrievers' rankings with weighted reciprocal rank
/// fusion.
///
/// A document at 1-based rank `r` in a retriever's list contributes
/// `weight / (r + c)` to its fused score; contributions for the same
/// document accumulate across retrievers, so documents found by both
/// sides outrank documents found by one.
pub struct EnsembleRetriever {
    retrievers: Vec<Arc<dyn Retriever>>,
    weights: Vec<f64>,
    c: usize,
}

impl fmt::Debug for EnsembleRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnsembleRetriever")
            .field(
                "retrievers",
                &format_args!("[{} retrievers]", self.retrievers.len()),
            )
            .field("weights", &self.weights)
            .field("c", &self.c)
            .finish()
    }
}

impl EnsembleRetriever {
    /// Creates an ensemble from paired retrievers and weights.
    ///
    /// Fails with [`Error::Configuration`] when the lists are empty or
    /// their lengths differ.
    pub fn new(retrievers: Vec<Arc<dyn Retriever>>, weights: Vec<f64>) -> Result<Self> {
        if retrievers.is_empty() {
            return Err(Error::Configuration(
                "ensemble needs at least one retriever".to_string(),
            ));
        }
        if retrievers.len() != weights.len() {
            return Err(Error::Configuration(format!(
                "ensemble has {} retrievers but {} weights",
                retrievers.len(),
                weights.len()
            )));
        }
        Ok(Self {
            retrievers,
            weights,
            c: DEFAULT_RRF_C,
        })
    }

    /// Creates an ensemble where every retriever carries weight `1/n`.
    pub fn with_equal_weights(retrievers: Vec<Arc<dyn Retriever>>) -> Result<Self> {
        let n = retrievers.len();
        if n == 0 {
            return Err(Error::Configuration(
                "ensemble needs at least one retriever".to_string(),
            ));
        }
        let weight = 1.0 / n as f64;
        Self::new(retrievers, vec![weight; n])
    }

    /// Overrides the rank-smoothing constant.
    #[must_use]
    pub fn with_c(mut self, c: usize) -> Self {
        self.c = c;
        self
    }

    /// Identity used for score accumulation and deduplication: the
    /// document id when set, else the content itself.
    fn doc_key(doc: &Document) -> String {
        doc.id
            .clone()
            .unwrap_or_else(|| doc.page_content.clone())
    }

    /// Fuses per-retriever rankings into one list.
    ///
    /// The sort is stable over the flattened list order, so tied scores
    /// resolve in favor of the earlier retriever's ranking.
    fn weighted_reciprocal_rank(&self, doc_lists: Vec<Vec<Document>>) -> Vec<Document> {
        let mut rrf_scores: HashMap<String, f64> = HashMap::new();
        for (docs, weight) in doc_lists.iter().zip(&self.weights) {
            for (rank, doc) in docs.iter().enumerate() {
                let contribution = weight / (rank + 1 + self.c) as f64;
                *rrf_scores.entry(Self::doc_key(doc)).or_insert(0.0) += contribution;
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut fused: Vec<(Document, f64)> = doc_lists
            .into_iter()
            .flatten()
            .filter(|doc| seen.insert(Self::doc_key(doc)))
            .map(|doc| {
                let score = rrf_scores.get(&Self::doc_key(&doc)).copied().unwrap_or(0.0);
                (doc, score)
            })
            .collect();
        fused.sort_by(|a, b| b.1.total_cmp(&a.1));
        fused.into_iter().map(|(doc, _)| doc).collect()
    }
}

#[async_trait]
impl Retriever for EnsembleRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let doc_lists = try_join_all(
            self.retrievers
                .iter()
                .map(|retriever| retriever.retrieve(query)),
        )
        .await?;
        Ok(self.weighted_reciprocal_rank(doc_lists))
    }
}

// ============================================================================
// Hybrid retriever
// ============================================================================

/// Which tier of the pipeline produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalTier {
    /// The weighted vector + lexical ensemble.
    Ensemble,
    /// Lexical search alone.
    KeywordOnly,
    /// Wide similarity search filtered by the cosine floor.
    ScoreFiltered,
    /// Every tier came up empty.
    Empty,
}

impl RetrievalTier {
    /// Stable name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalTier::Ensemble => "ensemble",
            RetrievalTier::KeywordOnly => "keyword_only",
            RetrievalTier::ScoreFiltered => "score_filtered",
            RetrievalTier::Empty => "empty",
        }
    }
}

impl fmt::Display for RetrievalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observational facts about one retrieval, passed to the logger.
#[derive(Debug, Clone)]
pub struct RetrievalMeta {
    /// Tier that produced the documents.
    pub tier: RetrievalTier,
    /// Number of documents returned.
    pub document_count: usize,
    /// Wall-clock time for the whole pipeline.
    pub elapsed: Duration,
}

/// Result of a retrieval: either ranked documents or an explicit
/// nothing-found signal.
///
/// The explicit variant lets the answer layer phrase a deterministic
/// refusal instead of guessing from an empty list.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    /// At least one relevant document, best first.
    Found(Vec<Document>),
    /// No tier produced a document for the query.
    NoRelevantInformation,
}

impl RetrievalOutcome {
    /// The retrieved documents; empty for `NoRelevantInformation`.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        match self {
            RetrievalOutcome::Found(docs) => docs,
            RetrievalOutcome::NoRelevantInformation => &[],
        }
    }

    /// Consumes the outcome, yielding the documents.
    #[must_use]
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            RetrievalOutcome::Found(docs) => docs,
            RetrievalOutcome::NoRelevantInformation => Vec::new(),
        }
    }

    /// Whether any document was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, RetrievalOutcome::Found(_))
    }
}

/// Caller-supplied hook observing retrievals. Purely observational: a
/// failing logger is reported at warn level and otherwise ignored.
#[async_trait]
pub trait RetrievalLogger: Send + Sync {
    /// Called once per retrieval with the query, the returned documents,
    /// and pipeline metadata.
    async fn log_retrieval(
        &self,
        query: &str,
        documents: &[Document],
        meta: &RetrievalMeta,
    ) -> Result<()>;
}

/// The tiered retrieval pipeline.
///
/// Build one per corpus snapshot via [`HybridRetriever::build`]; the
/// lexical index is constructed from the store's documents at that point
/// and does not track later insertions.
pub struct HybridRetriever {
    store: Arc<RwLock<InMemoryVectorStore>>,
    ensemble: EnsembleRetriever,
    keyword: Arc<KeywordRetriever>,
    min_score: f32,
    score_fallback_k: usize,
    logger: Option<Arc<dyn RetrievalLogger>>,
}

impl fmt::Debug for HybridRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridRetriever")
            .field("corpus", &self.keyword.len())
            .field("min_score", &self.min_score)
            .field("score_fallback_k", &self.score_fallback_k)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl HybridRetriever {
    /// Builds the pipeline over the store's current corpus.
    ///
    /// The vector retriever is listed first in the ensemble, so tied
    /// fused scores resolve in favor of vector similarity.
    pub async fn build(
        store: Arc<RwLock<InMemoryVectorStore>>,
        options: &RetrievalOptions,
    ) -> Result<Self> {
        let corpus = store.read().await.documents();
        let vector = Arc::new(
            VectorRetriever::new(Arc::clone(&store), options.k_vec, options.search_type)
                .with_min_score(options.min_score),
        );
        let keyword = Arc::new(KeywordRetriever::new(corpus, options.k_lex)?);
        let ensemble = EnsembleRetriever::new(
            vec![
                vector as Arc<dyn Retriever>,
                Arc::clone(&keyword) as Arc<dyn Retriever>,
            ],
            vec![DEFAULT_VECTOR_WEIGHT, DEFAULT_KEYWORD_WEIGHT],
        )?;
        Ok(Self {
            store,
            ensemble,
            keyword,
            min_score: options.min_score,
            score_fallback_k: options.k_vec.max(SCORE_FALLBACK_MIN_K),
            logger: None,
        })
    }

    /// Attaches an observational logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn RetrievalLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs the tiered pipeline for `query`.
    ///
    /// Never fails: a tier that errors (provider outage, index problem)
    /// is logged and treated as empty, and the pipeline moves on to the
    /// next tier. End users see a refusal message, not an exception.
    pub async fn retrieve(&self, query: &str) -> RetrievalOutcome {
        let started = Instant::now();
        let (documents, tier) = self.run_tiers(query).await;
        let meta = RetrievalMeta {
            tier,
            document_count: documents.len(),
            elapsed: started.elapsed(),
        };
        debug!(
            tier = %meta.tier,
            documents = meta.document_count,
            elapsed = ?meta.elapsed,
            "retrieval finished"
        );

        if let Some(logger) = &self.logger {
            if let Err(error) = logger.log_retrieval(query, &documents, &meta).await {
                warn!(%error, "retrieval logger failed");
            }
        }

        if documents.is_empty() {
            RetrievalOutcome::NoRelevantInformation
        } else {
            RetrievalOutcome::Found(documents)
        }
    }

    async fn run_tiers(&self, query: &str) -> (Vec<Document>, RetrievalTier) {
        match self.ensemble.retrieve(query).await {
            Ok(docs) if !docs.is_empty() => return (docs, RetrievalTier::Ensemble),
            Ok(_) => debug!("ensemble empty, trying keyword search alone"),
            Err(error) => warn!(%error, "ensemble failed, trying keyword search alone"),
        }

        match self.keyword.retrieve(query).await {
            Ok(docs) if !docs.is_empty() => return (docs, RetrievalTier::KeywordOnly),
            Ok(_) => debug!("keyword search empty, trying scored similarity"),
            Err(error) => warn!(%error, "keyword search failed, trying scored similarity"),
        }

        match self.scored_similarity(query).await {
            Ok(docs) if !docs.is_empty() => return (docs, RetrievalTier::ScoreFiltered),
            Ok(_) => {}
            Err(error) => warn!(%error, "scored similarity search failed"),
        }

        (Vec::new(), RetrievalTier::Empty)
    }

    /// Wide similarity search keeping only hits at or above the cosine
    /// floor.
    async fn scored_similarity(&self, query: &str) -> Result<Vec<Document>> {
        let hits = self
            .store
            .read()
            .await
            .similarity_search_with_score(query, self.score_fallback_k)
            .await?;
        Ok(hits
            .into_iter()
            .filter(|(_, score)| *score >= self.min_score)
            .map(|(doc, _)| doc)
            .collect())
    }
}
