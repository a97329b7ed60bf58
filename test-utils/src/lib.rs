//! Shared test doubles and fixtures for refdesk crates.
//!
//! Everything here is deterministic and network-free:
//!
//! - [`MockEmbeddings`]: byte-derived unit vectors with call counters,
//!   for asserting that warm starts never reach the embedding provider
//! - [`PlannedEmbeddings`]: scripted text-to-vector mapping for tests
//!   that need exact similarity rankings
//! - [`MockChatModel`]: scripted replies that record every prompt
//! - [`write_minimal_xlsx`]: a real single-sheet workbook on disk, for
//!   extraction and ingestion tests

pub mod mock_chat;
pub mod mock_embeddings;
pub mod xlsx;

pub use mock_chat::MockChatModel;
pub use mock_embeddings::{MockEmbeddings, PlannedEmbeddings};
pub use xlsx::write_minimal_xlsx;
