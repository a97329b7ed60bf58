//! Document ingestion, vector-index persistence, and hybrid retrieval
//! for a Turkish library-assistant QA service.
//!
//! The pipeline: source files are extracted per format ([`extract`]),
//! plain text is chunked ([`splitter`]) while spreadsheet rows stay whole,
//! the units are embedded and held in an in-memory cosine index
//! ([`vector_store`]), and the index round-trips through a validated disk
//! cache ([`persistence`]) so unchanged corpora skip re-embedding. Queries
//! run through a tiered hybrid retriever ([`retrieval`]) that fuses vector
//! and BM25 rankings, and [`answer`] turns the retrieved context into a
//! grounded reply with source citations.
//!
//! Provider backends implement [`Embeddings`] and [`ChatModel`]; concrete
//! clients live in the `refdesk-gemini` and `refdesk-openai` crates.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use refdesk::{AnswerComposer, DocumentService, ServiceConfig};
//! use refdesk_gemini::{GeminiChat, GeminiEmbeddings};
//!
//! # async fn example() -> refdesk::Result<()> {
//! let service = DocumentService::new(
//!     ServiceConfig::default(),
//!     Arc::new(GeminiEmbeddings::new()),
//! )?;
//! let report = service.ingest_directory("docs").await?;
//! println!("indexed {} units", report.documents_added);
//!
//! let outcome = service.search("Ödünç alma süresi ne kadar?").await?;
//! let composer = AnswerComposer::new(Arc::new(GeminiChat::new()));
//! let answer = composer.compose("Ödünç alma süresi ne kadar?", &outcome).await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod chat;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod error;
pub mod extract;
pub mod persistence;
pub mod retrieval;
pub mod service;
pub mod splitter;
pub mod vector_store;

pub use answer::{AnswerComposer, ChatLogger, ComposedAnswer};
pub use chat::{ChatMessage, ChatModel, ChatResponse, MessageRole, TokenUsage};
pub use config::{ProviderKind, ServiceConfig};
pub use documents::{Document, DocumentType};
pub use embeddings::Embeddings;
pub use error::{Error, Result};
pub use persistence::{CacheInfo, CacheManifest, VectorStorePersistence};
pub use retrieval::{
    HybridRetriever, RetrievalLogger, RetrievalOptions, RetrievalOutcome, Retriever, SearchType,
};
pub use service::{DocumentService, IngestReport};
pub use splitter::{RecursiveCharacterTextSplitter, SplitterConfig};
pub use vector_store::InMemoryVectorStore;
