//! Word-count chunking.
//!
//! Words are accumulated greedily; a chunk closes as soon as it holds
//! `max_words` words and any remainder becomes a shorter final chunk.
//!
//! ```text
//! max_words = 2
//!
//! Document: "w1 w2 w3 w4 w5"
//!
//! Chunk 1: "w1 w2"   words [0..2]
//! Chunk 2: "w3 w4"   words [2..4]
//! Chunk 3: "w5"      words [4..5]   <- remainder chunk
//! ```

use crate::document::Document;
use crate::types::Chunk;
use redraft_core::{AppError, AppResult, ChunkingConfig};

/// Independent word bounds for rewrite chunking and read-only display chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Bound for chunks submitted to the rewrite service
    pub rewrite_max_words: usize,

    /// Bound for chunks only shown to the reader
    pub display_max_words: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkingConfig::default().into()
    }
}

impl From<ChunkingConfig> for ChunkerConfig {
    fn from(config: ChunkingConfig) -> Self {
        Self {
            rewrite_max_words: config.rewrite_max_words,
            display_max_words: config.display_max_words,
        }
    }
}

impl ChunkerConfig {
    /// Reject zero bounds.
    pub fn validate(&self) -> AppResult<()> {
        validate_max_words(self.rewrite_max_words)?;
        validate_max_words(self.display_max_words)
    }
}

/// Split a document into chunks of at most `max_words` words.
///
/// Indices start at 1. An empty or whitespace-only document yields no chunks.
pub fn chunk_document(document: &Document, max_words: usize) -> AppResult<Vec<Chunk>> {
    validate_max_words(max_words)?;

    let words: Vec<&str> = document.words().collect();
    let mut chunks = Vec::with_capacity(words.len().div_ceil(max_words));

    for (offset, group) in words.chunks(max_words).enumerate() {
        let first = offset * max_words;
        let end = first + group.len();
        let bytes = document.span_bytes(first, end).ok_or_else(|| {
            AppError::Consistency(format!("word span {}..{} out of bounds", first, end))
        })?;

        chunks.push(Chunk::new(
            offset + 1,
            group.join(" "),
            group.len(),
            (first, end),
            (bytes.start, bytes.end),
        ));
    }

    tracing::debug!(
        "Chunked '{}' into {} chunks ({} words, max {} per chunk)",
        document.title(),
        chunks.len(),
        document.word_count(),
        max_words
    );

    Ok(chunks)
}

/// Chunk bare text without a title.
pub fn chunk_text(text: &str, max_words: usize) -> AppResult<Vec<Chunk>> {
    chunk_document(&Document::new("", text), max_words)
}

/// Chunk a document for read-only display using the display bound.
pub fn display_chunks(document: &Document, config: &ChunkerConfig) -> AppResult<Vec<Chunk>> {
    chunk_document(document, config.display_max_words)
}

fn validate_max_words(max_words: usize) -> AppResult<()> {
    if max_words == 0 {
        return Err(AppError::Input(
            "maxWords must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
