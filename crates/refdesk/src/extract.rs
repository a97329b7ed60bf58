//! Multi-format text extraction for source documents.
//!
//! Converts a single source file, dispatched on its extension, into either
//! normalized plain text or (for spreadsheets) a list of structured rows.
//! Spreadsheet rows are deliberately *not* merged into one blob: each row
//! becomes its own document unit downstream, which is what makes
//! row-granularity retrieval possible.
//!
//! Failure taxonomy: unknown extension → [`Error::UnsupportedFormat`];
//! recognized format with unparsable bytes → [`Error::CorruptSource`];
//! successful parse with no usable text → [`Error::EmptyExtraction`].
//! All three are per-file conditions that ingestion logs and skips.

use std::fs;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader as WorkbookReader};
use quick_xml::events::Event;

use crate::documents::DocumentType;
use crate::error::{Error, Result};

/// File extensions the extractor recognizes (lowercase, without dot).
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["txt", "pdf", "docx", "xlsx", "xls", "json", "xml"];

/// Maximum decompressed bytes read from a single OOXML zip entry.
/// Guards against zip bombs in hostile uploads.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Notice emitted for a sitemap that parses but contains no URL entries.
const SITEMAP_EMPTY_NOTICE: &str = "Sitemap XML dosyası işlendi ancak URL bulunamadı.";

/// Notice emitted for generic XML with effectively no character data.
const XML_EMPTY_NOTICE: &str = "XML dosyası işlendi ancak metin içeriği bulunamadı.";

/// One non-empty spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// Sheet the row came from.
    pub sheet_name: String,
    /// 1-based row number within the sheet.
    pub row_index: usize,
    /// Non-empty cell texts joined with single spaces.
    pub content: String,
    /// Row content framed with file/sheet/row context; this is the text
    /// that gets embedded, so a match can always be traced to its row.
    pub full_text: String,
}

/// Extraction result: normalized text, or one record per spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedContent {
    /// Normalized plain text ready for chunking.
    Text(String),
    /// Structured rows that bypass chunking.
    Rows(Vec<SheetRow>),
}

/// A successfully extracted file.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// Detected source format. XML refines to [`DocumentType::Sitemap`]
    /// when the content carries URL-set markers.
    pub document_type: DocumentType,
    /// The extracted payload.
    pub content: ExtractedContent,
}

/// Whether the path's extension is one the extractor handles.
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Maps the file extension to its declared document type.
///
/// `.xml` maps to [`DocumentType::Xml`]; sitemap refinement happens during
/// extraction once the content is visible.
pub fn declared_type(path: &Path) -> Result<DocumentType> {
    let ext = extension_of(path).unwrap_or_default();
    match ext.as_str() {
        "txt" => Ok(DocumentType::Text),
        "pdf" => Ok(DocumentType::Pdf),
        "docx" => Ok(DocumentType::Docx),
        "xlsx" | "xls" => Ok(DocumentType::ExcelRow),
        "json" => Ok(DocumentType::Json),
        "xml" => Ok(DocumentType::Xml),
        _ => Err(Error::UnsupportedFormat(if ext.is_empty() {
            path.display().to_string()
        } else {
            format!(".{ext}")
        })),
    }
}

/// Extracts a single source file.
pub fn extract_file(path: &Path) -> Result<Extracted> {
    match declared_type(path)? {
        DocumentType::Text => {
            let raw = fs::read(path)?;
            let text = normalize_text(&String::from_utf8_lossy(&raw));
            require_text(text, path).map(|t| Extracted {
                document_type: DocumentType::Text,
                content: ExtractedContent::Text(t),
            })
        }
        DocumentType::Pdf => extract_pdf(path).map(|t| Extracted {
            document_type: DocumentType::Pdf,
            content: ExtractedContent::Text(t),
        }),
        DocumentType::Docx => extract_docx(path).map(|t| Extracted {
            document_type: DocumentType::Docx,
            content: ExtractedContent::Text(t),
        }),
        DocumentType::ExcelRow => extract_workbook_rows(path).map(|rows| Extracted {
            document_type: DocumentType::ExcelRow,
            content: ExtractedContent::Rows(rows),
        }),
        DocumentType::Json => extract_json(path).map(|t| Extracted {
            document_type: DocumentType::Json,
            content: ExtractedContent::Text(t),
        }),
        DocumentType::Xml | DocumentType::Sitemap => extract_xml(path),
    }
}

/// Applies the uniform text normalization rules: carriage returns become
/// newlines, NUL bytes are stripped, trailing spaces/tabs before a newline
/// are removed, runs of 3+ newlines collapse to 2, and the edges are
/// trimmed.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let cleaned: String = unified.chars().filter(|&c| c != '\0').collect();

    let mut out = String::with_capacity(cleaned.len());
    let mut pending_empty = false;
    let mut seen_line = false;
    for line in cleaned.split('\n') {
        let line = line.trim_end_matches([' ', '\t']);
        if line.is_empty() {
            pending_empty = seen_line;
            continue;
        }
        if seen_line {
            out.push('\n');
            if pending_empty {
                out.push('\n');
            }
        }
        out.push_str(line);
        seen_line = true;
        pending_empty = false;
    }
    out.trim().to_string()
}

fn require_text(text: String, path: &Path) -> Result<String> {
    if text.is_empty() {
        Err(Error::EmptyExtraction(path.display().to_string()))
    } else {
        Ok(text)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_lowercase)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(std::ffi::OsStr::to_str)
        .map_or_else(|| path.display().to_string(), str::to_string)
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

fn extract_pdf(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Err(Error::CorruptSource(format!(
            "{}: empty PDF file",
            path.display()
        )));
    }
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| Error::CorruptSource(format!("{}: {e}", path.display())))?;
    require_text(normalize_text(&text), path)
}

// ---------------------------------------------------------------------------
// DOCX (OOXML word-processing)
// ---------------------------------------------------------------------------

fn extract_docx(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| Error::CorruptSource(format!("{}: {e}", path.display())))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| Error::CorruptSource(format!("{}: word/document.xml: {e}", path.display())))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| Error::CorruptSource(format!("{}: {e}", path.display())))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(Error::CorruptSource(format!(
            "{}: word/document.xml exceeds {MAX_XML_ENTRY_BYTES} byte limit",
            path.display()
        )));
    }

    let text = collect_docx_text(&xml)
        .map_err(|e| Error::CorruptSource(format!("{}: {e}", path.display())))?;
    require_text(normalize_text(&text), path)
}

/// Collects `<w:t>` text runs, inserting a newline at each paragraph end.
/// Text is taken untrimmed: runs regularly split mid-sentence and their
/// leading/trailing spaces are significant.
fn collect_docx_text(xml: &[u8]) -> std::result::Result<String, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_reader(xml);

    let mut out = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Spreadsheets (xlsx/xls)
// ---------------------------------------------------------------------------

fn extract_workbook_rows(path: &Path) -> Result<Vec<SheetRow>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::CorruptSource(format!("{}: {e}", path.display())))?;
    let file_name = file_name_of(path);

    let mut rows_out = Vec::new();
    for (sheet_name, range) in workbook.worksheets() {
        // The range only spans used cells; offset restores the sheet's
        // true 1-based row numbering.
        let first_row = range.start().map_or(0, |(row, _col)| row as usize);
        for (i, row) in range.rows().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .filter(|cell| !matches!(cell, Data::Empty))
                .map(format_cell)
                .filter(|text| !text.is_empty())
                .collect();
            if cells.is_empty() {
                continue;
            }
            let content = cells.join(" ");
            let row_index = first_row + i + 1;
            let full_text = format!(
                "Dosya: {file_name} | Sayfa: {sheet_name} | Satır {row_index}: {content}"
            );
            rows_out.push(SheetRow {
                sheet_name: sheet_name.clone(),
                row_index,
                content,
                full_text,
            });
        }
    }

    if rows_out.is_empty() {
        return Err(Error::EmptyExtraction(path.display().to_string()));
    }
    tracing::debug!(
        file = %file_name,
        rows = rows_out.len(),
        "extracted spreadsheet rows"
    );
    Ok(rows_out)
}

fn format_cell(cell: &Data) -> String {
    cell.to_string().trim().to_string()
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn extract_json(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| Error::CorruptSource(format!("{}: {e}", path.display())))?;
    let pretty = serde_json::to_string_pretty(&value)?;
    require_text(pretty, path)
}

// ---------------------------------------------------------------------------
// XML / sitemap
// ---------------------------------------------------------------------------

fn extract_xml(path: &Path) -> Result<Extracted> {
    let raw = fs::read_to_string(path)?;
    if raw.contains("<urlset") && raw.contains("<loc>") {
        let text = extract_sitemap(&raw, path)?;
        return Ok(Extracted {
            document_type: DocumentType::Sitemap,
            content: ExtractedContent::Text(text),
        });
    }
    let text = extract_generic_xml(&raw, path)?;
    Ok(Extracted {
        document_type: DocumentType::Xml,
        content: ExtractedContent::Text(text),
    })
}

#[derive(Debug, Default)]
struct SitemapEntry {
    loc: String,
    lastmod: String,
    description: String,
    priority: String,
}

fn extract_sitemap(raw: &str, path: &Path) -> Result<String> {
    let entries = parse_sitemap_entries(raw)
        .map_err(|e| Error::CorruptSource(format!("{}: {e}", path.display())))?;
    if entries.is_empty() {
        tracing::warn!(file = %path.display(), "sitemap contains no URL entries");
        return Ok(SITEMAP_EMPTY_NOTICE.to_string());
    }

    let blocks: Vec<String> = entries.iter().map(sitemap_entry_block).collect();
    let mut combined = String::from("KÜTÜPHANE WEB SİTESİ HARİTASI\n");
    combined.push_str(&format!("Dosya: {}\n", file_name_of(path)));
    combined.push_str(&format!("Toplam sayfa sayısı: {}\n\n", entries.len()));
    combined.push_str("=== SAYFA LİSTESİ ===\n\n");
    combined.push_str(&blocks.join("\n\n"));
    Ok(normalize_text(&combined))
}

fn parse_sitemap_entries(raw: &str) -> std::result::Result<Vec<SitemapEntry>, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_reader(raw.as_bytes());
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<SitemapEntry> = None;
    let mut field: Option<&'static str> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"url" => current = Some(SitemapEntry::default()),
                b"loc" => field = Some("loc"),
                b"lastmod" => field = Some("lastmod"),
                b"description" => field = Some("description"),
                b"priority" => field = Some("priority"),
                _ => field = None,
            },
            Event::Text(t) => {
                if let (Some(entry), Some(name)) = (current.as_mut(), field) {
                    let value = t.unescape().unwrap_or_default().trim().to_string();
                    match name {
                        "loc" => entry.loc = value,
                        "lastmod" => entry.lastmod = value,
                        "description" => entry.description = value,
                        "priority" => entry.priority = value,
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                field = None;
                if e.local_name().as_ref() == b"url" {
                    if let Some(entry) = current.take() {
                        if !entry.loc.is_empty() {
                            entries.push(entry);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

/// Renders one human-readable block per sitemap URL entry: page name, URL,
/// last-modified, priority, then inferred category and keywords from the
/// URL path (and description, when present).
fn sitemap_entry_block(entry: &SitemapEntry) -> String {
    let path_parts: Vec<&str> = url_path(&entry.loc)
        .split('/')
        .filter(|p| !p.is_empty())
        .collect();
    let page_name = path_parts.last().copied().unwrap_or("ana-sayfa");

    let mut block = format!("Sayfa: {}\n", page_name.replace('-', " "));
    block.push_str(&format!("URL: {}\n", entry.loc));
    if !entry.lastmod.is_empty() {
        block.push_str(&format!("Son güncelleme: {}\n", entry.lastmod));
    }
    if !entry.priority.is_empty() {
        block.push_str(&format!("Öncelik: {}\n", entry.priority));
    }
    if !entry.description.is_empty() {
        block.push_str(&format!("Açıklama: {}\n", entry.description));
    }
    if path_parts.len() > 1 {
        let category = path_parts[..path_parts.len() - 1]
            .join(" > ")
            .replace('-', " ");
        block.push_str(&format!("Kategori: {category}\n"));
    }

    let mut keywords: Vec<String> = Vec::new();
    let mut push_keyword = |word: &str| {
        if word.chars().count() > 2 && !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    };
    for part in &path_parts {
        for word in part.split('-') {
            push_keyword(word);
        }
    }
    if !entry.description.is_empty() {
        let lowered = entry.description.to_lowercase();
        for word in lowered.split(|c: char| !c.is_alphanumeric()) {
            push_keyword(word);
        }
    }
    if !keywords.is_empty() {
        block.push_str(&format!("Anahtar kelimeler: {}\n", keywords.join(", ")));
    }
    block
}

/// Path component of a URL, without scheme/host/query. Hand-rolled on
/// purpose: sitemap locs are well-formed absolute URLs and this avoids a
/// full URL parser dependency.
fn url_path(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(url, |i| &url[i + 3..]);
    let path = after_scheme.find('/').map_or("", |i| &after_scheme[i..]);
    let end = path
        .find(['?', '#'])
        .unwrap_or(path.len());
    &path[..end]
}

fn extract_generic_xml(raw: &str, path: &Path) -> Result<String> {
    let mut reader = quick_xml::Reader::from_reader(raw.as_bytes());
    reader.config_mut().trim_text(true);

    let mut parts: Vec<String> = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::CorruptSource(format!("{}: {e}", path.display())))?
        {
            Event::Text(t) => {
                let text = t.unescape().unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    parts.push(text.to_string());
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c).trim().to_string();
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let joined = parts.join(" ");
    let collapsed: String = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() < 10 {
        return Ok(XML_EMPTY_NOTICE.to_string());
    }
    Ok(normalize_text(&collapsed))
}
