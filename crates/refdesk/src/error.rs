//! Error types for ingestion, persistence, and retrieval.
//!
//! Extraction failures (`UnsupportedFormat`, `CorruptSource`,
//! `EmptyExtraction`) are per-file: callers log them and continue with the
//! remaining files. `Provider` failures are per-batch: already-embedded
//! batches stay in the index. Persistence read problems are deliberately
//! *not* errors: a missing or corrupt cache is a cache miss (see
//! [`crate::persistence`]), only write failures surface as
//! [`Error::Persistence`].

use thiserror::Error;

/// Core error type for refdesk operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// File extension is not one of the supported document formats.
    ///
    /// The file is skipped; ingestion continues.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The file was recognized but its bytes could not be parsed
    /// (truncated PDF, broken zip container, invalid workbook, ...).
    #[error("Corrupt source file: {0}")]
    CorruptSource(String),

    /// Extraction succeeded but produced no usable text.
    #[error("No text extracted: {0}")]
    EmptyExtraction(String),

    /// An embedding or chat provider call failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Writing the cache artifacts failed (disk full, permissions).
    ///
    /// The in-memory index remains usable after this error.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid configuration or builder parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors that don't fit the categories above.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
