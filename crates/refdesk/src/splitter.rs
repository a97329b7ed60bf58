//! Recursive character-based text chunking.
//!
//! Long extracted text is split into bounded, overlapping chunks before
//! embedding. The splitter descends through a separator hierarchy
//! (paragraph, line, word, character) so that chunk boundaries land on the
//! coarsest structure that fits, then packs the pieces into chunks of at
//! most `chunk_size` characters while carrying a `chunk_overlap`-character
//! tail window into the next chunk. Splitting is fully deterministic for
//! identical inputs and configuration.
//!
//! Spreadsheet rows never pass through here; each row is already an
//! atomic unit (see [`crate::extract`]).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator hierarchy used by [`RecursiveCharacterTextSplitter::new`].
/// The empty string means "split between characters" and must come last.
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Chunking parameters.
///
/// Lengths are measured in characters, not bytes; the corpus is Turkish
/// and multi-byte code points are common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk.
    pub chunk_overlap: usize,
    /// Trim whitespace from chunk edges and drop empty chunks.
    pub strip_whitespace: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 300,
            strip_whitespace: true,
        }
    }
}

impl SplitterConfig {
    /// Creates a config with the given size and overlap.
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            strip_whitespace: true,
        }
    }

    /// Validates size/overlap consistency.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration(format!(
                "chunk_size must be > 0, got {}",
                self.chunk_size
            )));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits text recursively over a separator hierarchy.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterTextSplitter {
    config: SplitterConfig,
    separators: Vec<String>,
}

impl RecursiveCharacterTextSplitter {
    /// Creates a splitter with the default separator hierarchy.
    pub fn new(config: SplitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    /// Replaces the separator hierarchy. The final separator should be the
    /// empty string so arbitrarily long runs can still be chunked.
    #[must_use]
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Splits `text` into chunks of at most `chunk_size` characters.
    ///
    /// A longer chunk can only appear when a single unsplittable piece
    /// exceeds the limit, which is logged at warn level.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the coarsest separator that actually occurs in this text;
        // the empty separator always matches.
        let mut sep_idx = separators.len().saturating_sub(1);
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep.as_str()) {
                sep_idx = i;
                break;
            }
        }
        let separator = separators.get(sep_idx).map_or("", String::as_str);
        let remaining = &separators[(sep_idx + 1).min(separators.len())..];

        let splits = split_keeping_separator(text, separator);

        let mut chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();
        for piece in splits {
            let len = char_len(&piece);
            if len < self.config.chunk_size {
                good.push(piece);
            } else {
                if !good.is_empty() {
                    chunks.extend(self.merge_splits(&good));
                    good.clear();
                }
                if remaining.is_empty() {
                    // Unsplittable at the finest granularity; emit as-is.
                    if len > self.config.chunk_size {
                        tracing::warn!(
                            chunk_chars = len,
                            max_chunk_chars = self.config.chunk_size,
                            "unsplittable text run exceeds chunk_size"
                        );
                    }
                    chunks.push(piece);
                } else {
                    chunks.extend(self.split_recursive(&piece, remaining));
                }
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge_splits(&good));
        }
        chunks
    }

    /// Packs separator-retaining pieces into chunks, keeping an overlap
    /// window of trailing pieces alive between consecutive chunks.
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut window: VecDeque<usize> = VecDeque::new();
        let mut total = 0usize;

        let flush = |window: &VecDeque<usize>, docs: &mut Vec<String>| {
            let joined: String = window.iter().map(|&i| splits[i].as_str()).collect();
            let doc = if self.config.strip_whitespace {
                joined.trim().to_string()
            } else {
                joined
            };
            if !doc.is_empty() {
                docs.push(doc);
            }
        };

        for (idx, split) in splits.iter().enumerate() {
            let len = char_len(split);
            if total + len > self.config.chunk_size && !window.is_empty() {
                flush(&window, &mut docs);
                // Shrink the window down to the overlap budget, and
                // further if the incoming piece still would not fit.
                while total > self.config.chunk_overlap
                    || (total + len > self.config.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(removed) => total -= char_len(&splits[removed]),
                        None => break,
                    }
                }
            }
            window.push_back(idx);
            total += len;
        }

        if !window.is_empty() {
            flush(&window, &mut docs);
        }
        docs
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Splits `text` on `separator`, keeping each separator attached to the
/// end of the piece that precedes it, so concatenating the pieces
/// reproduces the input exactly. The empty separator yields one piece per
/// character.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, matched) in text.match_indices(separator) {
        let end = pos + matched.len();
        pieces.push(text[start..end].to_string());
        start = end;
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    pieces
}
