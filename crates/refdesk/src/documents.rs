//! Document units and their provenance metadata.
//!
//! A [`Document`] is one indexed piece of text plus a free-form metadata
//! map. Every ingested unit carries at least [`keys::SOURCE`] and
//! [`keys::DOCUMENT_TYPE`]; spreadsheet rows add sheet/row provenance so
//! retrieval can cite the exact row. Identity is positional within the
//! index; `id` is optional and only set when a caller needs a stable key.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata keys written by the ingestion pipeline.
///
/// The camelCase spelling is load-bearing: these keys appear verbatim in
/// the persisted `documents.json`/`vectors.json` artifacts.
pub mod keys {
    /// Originating file name or URL.
    pub const SOURCE: &str = "source";
    /// One of the [`super::DocumentType`] names.
    pub const DOCUMENT_TYPE: &str = "documentType";
    /// Spreadsheet sheet name (rows only).
    pub const SHEET_NAME: &str = "sheetName";
    /// 1-based spreadsheet row number (rows only).
    pub const ROW_INDEX: &str = "rowIndex";
    /// Raw cell text of the row before context framing (rows only).
    pub const ROW_CONTENT: &str = "rowContent";
    /// Page number for page-granular sources.
    pub const PAGE: &str = "page";
}

/// Source format of a document unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Plain UTF-8 text file.
    Text,
    /// PDF text stream.
    Pdf,
    /// Word-processor document (raw text only).
    Docx,
    /// One spreadsheet row, indexed as its own unit.
    ExcelRow,
    /// Pretty-printed projection of a JSON file.
    Json,
    /// Generic XML with tags stripped.
    Xml,
    /// Sitemap XML, one structured block per URL entry.
    Sitemap,
}

impl DocumentType {
    /// Stable name used in metadata and the persisted artifacts.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Text => "text",
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::ExcelRow => "excel_row",
            DocumentType::Json => "json",
            DocumentType::Xml => "xml",
            DocumentType::Sitemap => "sitemap",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One indexed piece of text plus its provenance metadata.
///
/// Immutable by convention once it enters the vector index; the builder
/// methods are for construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The text content that is embedded and searched.
    pub page_content: String,

    /// Provenance and retrieval metadata. Arbitrary JSON values keyed by
    /// the constants in [`keys`].
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Optional stable identifier. Unset for pipeline-created units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Document {
    /// Creates a document with empty metadata.
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: HashMap::new(),
            id: None,
        }
    }

    /// Adds a metadata entry, builder style.
    #[must_use]
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the identifier, builder style.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns a metadata value, if present.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Returns the `source` metadata as a string, if present.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(keys::SOURCE).and_then(|v| v.as_str())
    }

    /// Returns the declared [`DocumentType`], if the metadata carries one.
    #[must_use]
    pub fn document_type(&self) -> Option<DocumentType> {
        self.metadata
            .get(keys::DOCUMENT_TYPE)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.page_content)
    }
}
