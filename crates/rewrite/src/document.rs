//! Source documents and their word tokenization.

use sha2::{Digest, Sha256};
use std::ops::Range;

/// Immutable source text plus the byte range of every whitespace-delimited word.
///
/// The word list is computed once and never changes; chunking and
/// reintegration both address the text through it.
#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    text: String,
    words: Vec<Range<usize>>,
    fingerprint: String,
}

impl Document {
    /// Tokenize `text` and wrap it with its identifying title.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let words = tokenize(&text);
        let fingerprint = calculate_hash(&text);

        Self {
            title: title.into(),
            text,
            words,
            fingerprint,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// SHA-256 of the text, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of words in the document.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate over the words in document order.
    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.iter().map(move |range| &self.text[range.clone()])
    }

    /// Byte range of the word at `position` (0-based).
    pub fn word_range(&self, position: usize) -> Option<Range<usize>> {
        self.words.get(position).cloned()
    }

    /// Byte range covering words `first..end` (0-based, end exclusive).
    ///
    /// Returns `None` for an empty or out-of-bounds span.
    pub fn span_bytes(&self, first: usize, end: usize) -> Option<Range<usize>> {
        if first >= end || end > self.words.len() {
            return None;
        }
        Some(self.words[first].start..self.words[end - 1].end)
    }

    /// Text covered by a byte range, if it lies on character boundaries.
    pub fn slice(&self, range: Range<usize>) -> Option<&str> {
        self.text.get(range)
    }
}

/// Split `text` into runs of non-whitespace characters.
fn tokenize(text: &str) -> Vec<Range<usize>> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (offset, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(begin)) => {
                words.push(begin..offset);
                start = None;
            }
            (false, None) => start = Some(offset),
            _ => {}
        }
    }

    if let Some(begin) = start {
        words.push(begin..text.len());
    }

    words
}

/// Calculate SHA-256 hash of text.
fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_collapses_whitespace_runs() {
        let doc = Document::new("t", "  alpha \t beta\n\ngamma ");
        let words: Vec<&str> = doc.words().collect();
        assert_eq!(words, vec!["alpha", "beta", "gamma"]);
        assert_eq!(doc.word_range(0), Some(2..7));
    }

    #[test]
    fn test_matches_split_whitespace() {
        let text = "Acentuação: ã, õ, ç 🎮\u{00A0}emoji\u{2003}spaces";
        let doc = Document::new("t", text);
        let expected: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(doc.words().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(Document::new("t", "").is_empty());
        assert!(Document::new("t", " \n\t ").is_empty());
    }

    #[test]
    fn test_span_bytes() {
        let doc = Document::new("t", "w1 w2\n\nw3 w4");
        assert_eq!(doc.span_bytes(1, 3), Some(3..9));
        assert_eq!(doc.span_bytes(2, 2), None);
        assert_eq!(doc.span_bytes(0, 5), None);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Document::new("a", "same text");
        let b = Document::new("b", "same text");
        let c = Document::new("a", "other text");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
