//! Editing sessions.

use crate::chunker::{display_chunks, ChunkerConfig};
use crate::document::Document;
use crate::reintegrate::{self, ConsolidatedExport, MergedDocument};
use crate::store::{shared, ChunkStore, SharedChunkStore};
use crate::types::Chunk;
use redraft_core::AppResult;
use std::sync::Arc;

/// One document, its rewrite chunks and its display chunks.
///
/// Loading a new document discards everything from the previous one.
pub struct EditingSession {
    document: Arc<Document>,
    store: SharedChunkStore,
    display: Vec<Chunk>,
    config: ChunkerConfig,
}

impl EditingSession {
    pub fn load(document: Document, config: ChunkerConfig) -> AppResult<Self> {
        config.validate()?;

        let store = ChunkStore::new(&document, config.rewrite_max_words)?;
        let display_list = display_chunks(&document, &config)?;

        tracing::info!(
            title = %document.title(),
            words = document.word_count(),
            chunks = store.len(),
            display_chunks = display_list.len(),
            "Loaded document"
        );

        Ok(Self {
            document: Arc::new(document),
            store: shared(store),
            display: display_list,
            config,
        })
    }

    /// Replace the session's document, keeping the chunker configuration.
    pub fn reload(&mut self, document: Document) -> AppResult<()> {
        *self = Self::load(document, self.config)?;
        Ok(())
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// The authoritative rewrite store.
    pub fn store(&self) -> &SharedChunkStore {
        &self.store
    }

    /// Read-only display chunks (independent size bound).
    pub fn display_chunks(&self) -> &[Chunk] {
        &self.display
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Return every rewrite chunk to `Pending`.
    pub async fn reset(&self) -> AppResult<()> {
        self.store.write().await.reset()
    }

    pub async fn consolidate(&self) -> String {
        reintegrate::consolidate(&*self.store.read().await)
    }

    pub async fn export(&self) -> ConsolidatedExport {
        reintegrate::export(&*self.store.read().await, self.document.title())
    }

    /// The document with every rewritten chunk merged in.
    pub async fn merged(&self) -> AppResult<MergedDocument> {
        let store = self.store.read().await;
        let base = MergedDocument::new(Arc::clone(&self.document), &store)?;
        reintegrate::merge_all(&base, &store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkStatus;

    fn config() -> ChunkerConfig {
        ChunkerConfig {
            rewrite_max_words: 2,
            display_max_words: 4,
        }
    }

    #[tokio::test]
    async fn test_load_builds_both_chunkings() {
        let session = EditingSession::load(Document::new("t", "w1 w2 w3 w4 w5"), config()).unwrap();

        assert_eq!(session.store().read().await.len(), 3);
        assert_eq!(session.display_chunks().len(), 2);
        assert_eq!(session.document().word_count(), 5);
    }

    #[tokio::test]
    async fn test_reload_discards_previous_state() {
        let mut session = EditingSession::load(Document::new("a", "w1 w2 w3"), config()).unwrap();
        session.store().write().await.select_all();

        session.reload(Document::new("b", "x1 x2 x3 x4")).unwrap();

        let store = session.store().read().await;
        assert_eq!(session.document().title(), "b");
        assert_eq!(store.len(), 2);
        assert!(store.chunks().iter().all(|c| c.status == ChunkStatus::Pending));
    }

    #[tokio::test]
    async fn test_reset_and_consolidate() {
        let session = EditingSession::load(Document::new("t", "w1 w2 w3"), config()).unwrap();
        session.store().write().await.select(1).unwrap();

        session.reset().await.unwrap();
        assert!(session.store().read().await.selected_indices().is_empty());
        assert_eq!(session.consolidate().await, "");
        assert_eq!(session.merged().await.unwrap().text(), "w1 w2 w3");
        assert!(!session.export().await.complete);
    }

    #[test]
    fn test_zero_bound_rejected() {
        let config = ChunkerConfig {
            rewrite_max_words: 0,
            display_max_words: 4,
        };
        let err = EditingSession::load(Document::new("t", "w1"), config).err().unwrap();
        assert!(err.is_input());
    }
}
