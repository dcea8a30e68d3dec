//! Result reintegration.
//!
//! Two read-only views over a chunk store:
//! - [`consolidate`] joins every rewritten output in index order.
//! - [`merge_into_document`] splices one rewritten chunk back into the span
//!   it occupied in the original document.
//!
//! Merging always renders from the original text and the original chunk
//! boundaries, so the order in which chunks are merged does not matter and
//! the whitespace between chunks is kept as it was.

use crate::document::Document;
use crate::store::ChunkStore;
use crate::types::ChunkStatus;
use redraft_core::{AppError, AppResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

/// Separator placed between consolidated outputs.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Join the output of every rewritten chunk, ascending by index.
///
/// Chunks that are not rewritten are omitted.
pub fn consolidate(store: &ChunkStore) -> String {
    store
        .rewritten()
        .filter_map(|chunk| chunk.output.as_deref())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR)
}

/// Consolidated text plus what export encoders need to label it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedExport {
    pub title: String,
    pub text: String,

    /// Indices whose output is part of `text`
    pub included: Vec<usize>,

    /// Indices not yet rewritten
    pub missing: Vec<usize>,

    /// Whether every chunk is rewritten
    pub complete: bool,
}

pub fn export(store: &ChunkStore, title: impl Into<String>) -> ConsolidatedExport {
    let (included, missing): (Vec<usize>, Vec<usize>) = store
        .chunks()
        .iter()
        .map(|chunk| chunk.index)
        .partition(|&index| {
            store
                .get(index)
                .is_some_and(|chunk| chunk.status == ChunkStatus::Rewritten)
        });

    ConsolidatedExport {
        title: title.into(),
        text: consolidate(store),
        complete: missing.is_empty(),
        included,
        missing,
    }
}

/// Position of one chunk in the merged text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedSpan {
    pub index: usize,
    pub range: Range<usize>,
    pub replaced: bool,
}

/// The original document with zero or more chunk spans replaced.
#[derive(Debug, Clone)]
pub struct MergedDocument {
    original: Arc<Document>,
    boundaries: Vec<(usize, Range<usize>)>,
    replacements: BTreeMap<usize, String>,
    text: String,
    spans: Vec<MergedSpan>,
}

impl MergedDocument {
    /// Start from the unmodified document, using the store's chunk boundaries.
    pub fn new(document: Arc<Document>, store: &ChunkStore) -> AppResult<Self> {
        check_fingerprint(&document, store)?;

        let boundaries = store
            .chunks()
            .iter()
            .map(|chunk| (chunk.index, chunk.byte_range.0..chunk.byte_range.1))
            .collect();

        let mut merged = Self {
            original: document,
            boundaries,
            replacements: BTreeMap::new(),
            text: String::new(),
            spans: Vec::new(),
        };
        merged.render()?;
        Ok(merged)
    }

    /// Current text with every applied replacement.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn original(&self) -> &Arc<Document> {
        &self.original
    }

    /// Chunk index to merged-text position, in index order.
    pub fn spans(&self) -> &[MergedSpan] {
        &self.spans
    }

    pub fn span(&self, index: usize) -> Option<&MergedSpan> {
        self.spans.iter().find(|span| span.index == index)
    }

    /// Indices whose span has been replaced.
    pub fn merged_indices(&self) -> Vec<usize> {
        self.replacements.keys().copied().collect()
    }

    /// The merged text as a fresh document with the original title.
    pub fn to_document(&self) -> Document {
        Document::new(self.original.title(), self.text.clone())
    }

    fn with_replacement(&self, index: usize, output: &str) -> AppResult<Self> {
        let mut next = self.clone();
        next.replacements.insert(index, output.to_string());
        next.render()?;
        Ok(next)
    }

    fn render(&mut self) -> AppResult<()> {
        let source = self.original.text();
        let mut text = String::with_capacity(source.len());
        let mut spans = Vec::with_capacity(self.boundaries.len());
        let mut cursor = 0;

        for (index, range) in &self.boundaries {
            text.push_str(self.slice(cursor..range.start)?);

            let start = text.len();
            let replaced = match self.replacements.get(index) {
                Some(output) => {
                    text.push_str(output);
                    true
                }
                None => {
                    text.push_str(self.slice(range.clone())?);
                    false
                }
            };
            spans.push(MergedSpan {
                index: *index,
                range: start..text.len(),
                replaced,
            });
            cursor = range.end;
        }
        text.push_str(self.slice(cursor..source.len())?);

        self.text = text;
        self.spans = spans;
        Ok(())
    }

    fn slice(&self, range: Range<usize>) -> AppResult<&str> {
        self.original.slice(range.clone()).ok_or_else(|| {
            AppError::Consistency(format!(
                "byte range {}..{} does not fit the document",
                range.start, range.end
            ))
        })
    }
}

/// Replace chunk `index`'s original span with its rewritten output.
///
/// # Errors
/// - `AppError::Input` if the store has no such chunk.
/// - `AppError::Consistency` if the chunk is not rewritten or the store was
///   chunked from another document.
pub fn merge_into_document(
    merged: &MergedDocument,
    store: &ChunkStore,
    index: usize,
) -> AppResult<MergedDocument> {
    check_fingerprint(merged.original(), store)?;

    let chunk = store
        .get(index)
        .ok_or_else(|| AppError::Input(format!("no chunk with index {}", index)))?;

    let output = match (chunk.status, chunk.output.as_deref()) {
        (ChunkStatus::Rewritten, Some(output)) => output,
        (status, _) => {
            return Err(AppError::Consistency(format!(
                "cannot merge chunk {} while it is {}",
                index, status
            )))
        }
    };

    let boundary_matches = merged
        .boundaries
        .iter()
        .any(|(i, range)| *i == index && (range.start, range.end) == chunk.byte_range);
    if !boundary_matches {
        return Err(AppError::Consistency(format!(
            "chunk {} does not match the merged document's chunking",
            index
        )));
    }

    merged.with_replacement(index, output)
}

/// Merge every rewritten chunk of `store`.
pub fn merge_all(merged: &MergedDocument, store: &ChunkStore) -> AppResult<MergedDocument> {
    let mut current = merged.clone();
    for chunk in store.rewritten() {
        current = merge_into_document(&current, store, chunk.index)?;
    }
    Ok(current)
}

fn check_fingerprint(document: &Document, store: &ChunkStore) -> AppResult<()> {
    if document.fingerprint() != store.fingerprint() {
        return Err(AppError::Consistency(
            "chunk store was built from a different document".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn rewrite(store: &mut ChunkStore, index: usize, output: &str) {
        let run = Uuid::new_v4();
        store.select(index).unwrap();
        store.begin_run(run, &[index]).unwrap();
        store.mark_in_progress(run, index).unwrap();
        store.mark_rewritten(run, index, output.to_string()).unwrap();
        store.finish_run(run);
    }

    fn fixture(text: &str, max_words: usize) -> (Arc<Document>, ChunkStore) {
        let document = Arc::new(Document::new("Essay", text));
        let store = ChunkStore::new(&document, max_words).unwrap();
        (document, store)
    }

    #[test]
    fn test_consolidate_skips_unrewritten() {
        let (_, mut store) = fixture("w1 w2 w3 w4 w5", 2);
        assert_eq!(consolidate(&store), "");

        rewrite(&mut store, 3, "W5");
        rewrite(&mut store, 1, "W1 W2");
        assert_eq!(consolidate(&store), "W1 W2\n\nW5");
    }

    #[test]
    fn test_export_reports_missing() {
        let (_, mut store) = fixture("w1 w2 w3 w4 w5", 2);
        rewrite(&mut store, 2, "W3 W4");

        let export = export(&store, "Essay");
        assert_eq!(export.included, vec![2]);
        assert_eq!(export.missing, vec![1, 3]);
        assert!(!export.complete);
        assert_eq!(export.text, "W3 W4");
    }

    #[test]
    fn test_merge_preserves_surrounding_whitespace() {
        let (document, mut store) = fixture("w1 w2\n\nw3 w4\nw5", 2);
        rewrite(&mut store, 2, "W3 W4");

        let merged = MergedDocument::new(document, &store).unwrap();
        let merged = merge_into_document(&merged, &store, 2).unwrap();

        assert_eq!(merged.text(), "w1 w2\n\nW3 W4\nw5");
        assert_eq!(merged.merged_indices(), vec![2]);
        let span = merged.span(2).unwrap();
        assert!(span.replaced);
        assert_eq!(&merged.text()[span.range.clone()], "W3 W4");
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let (document, mut store) = fixture("a b c d e f", 2);
        rewrite(&mut store, 1, "ALPHA BRAVO CHARLIE");
        rewrite(&mut store, 3, "E");

        let base = MergedDocument::new(document, &store).unwrap();
        let forward = merge_into_document(&base, &store, 1)
            .and_then(|m| merge_into_document(&m, &store, 3))
            .unwrap();
        let backward = merge_into_document(&base, &store, 3)
            .and_then(|m| merge_into_document(&m, &store, 1))
            .unwrap();

        assert_eq!(forward.text(), "ALPHA BRAVO CHARLIE c d E");
        assert_eq!(forward.text(), backward.text());
        assert_eq!(merge_all(&base, &store).unwrap().text(), forward.text());
    }

    #[test]
    fn test_merge_is_pure() {
        let (document, mut store) = fixture("w1 w2 w3", 2);
        rewrite(&mut store, 1, "W1 W2");

        let base = MergedDocument::new(document, &store).unwrap();
        let merged = merge_into_document(&base, &store, 1).unwrap();

        assert_eq!(base.text(), "w1 w2 w3");
        assert_eq!(merged.text(), "W1 W2 w3");
        assert_eq!(merged.to_document().title(), "Essay");
    }

    #[test]
    fn test_merge_rejects_unrewritten_chunk() {
        let (document, store) = fixture("w1 w2 w3", 2);
        let base = MergedDocument::new(document, &store).unwrap();

        assert!(merge_into_document(&base, &store, 1)
            .unwrap_err()
            .is_consistency());
        assert!(merge_into_document(&base, &store, 7).unwrap_err().is_input());
    }

    #[test]
    fn test_merge_rejects_foreign_store() {
        let (document, _) = fixture("w1 w2 w3", 2);
        let (_, mut other) = fixture("x1 x2 x3", 2);
        rewrite(&mut other, 1, "X");

        assert!(MergedDocument::new(Arc::clone(&document), &other)
            .unwrap_err()
            .is_consistency());
    }
}
