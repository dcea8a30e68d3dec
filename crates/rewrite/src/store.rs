//! The authoritative chunk collection and its selection state.
//!
//! Every change is a whole-record replacement: the store builds the next
//! version of a chunk, checks it, and swaps it in. Callers only ever see
//! shared references or clones.

use crate::chunker::chunk_document;
use crate::document::Document;
use crate::types::{Chunk, ChunkStatus};
use redraft_core::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Store shared between the orchestrator and selection edits.
pub type SharedChunkStore = Arc<RwLock<ChunkStore>>;

/// Wrap a store for sharing.
pub fn shared(store: ChunkStore) -> SharedChunkStore {
    Arc::new(RwLock::new(store))
}

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub total: usize,
    pub pending: usize,
    pub selected: usize,
    pub in_progress: usize,
    pub rewritten: usize,
    pub failed: usize,
    /// Chunks that the next run would include
    pub included: usize,
}

/// Bookkeeping for the run currently holding the store.
#[derive(Debug, Clone)]
struct ActiveRun {
    id: Uuid,
    queue: Vec<usize>,
}

/// Ordered chunk records keyed by their 1-based index.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    fingerprint: String,
    chunks: Vec<Chunk>,
    active_run: Option<ActiveRun>,
}

impl ChunkStore {
    /// Chunk `document` and hold the result.
    pub fn new(document: &Document, max_words: usize) -> AppResult<Self> {
        let chunks = chunk_document(document, max_words)?;
        Self::from_chunks(document.fingerprint(), chunks)
    }

    /// Hold chunks produced elsewhere, checking that indices run 1..=N.
    pub fn from_chunks(fingerprint: impl Into<String>, chunks: Vec<Chunk>) -> AppResult<Self> {
        for (position, chunk) in chunks.iter().enumerate() {
            if chunk.index != position + 1 {
                return Err(AppError::Consistency(format!(
                    "chunk indices are not contiguous: expected {}, found {}",
                    position + 1,
                    chunk.index
                )));
            }
            chunk.check_invariants().map_err(AppError::Consistency)?;
        }

        Ok(Self {
            fingerprint: fingerprint.into(),
            chunks,
            active_run: None,
        })
    }

    /// Fingerprint of the document these chunks were cut from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All chunks in index order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        index
            .checked_sub(1)
            .and_then(|position| self.chunks.get(position))
    }

    /// Whether an orchestration run currently holds the store.
    pub fn is_running(&self) -> bool {
        self.active_run.is_some()
    }

    /// Replace the record at `index` with `updated`.
    ///
    /// The replacement must describe the same span and satisfy the
    /// status/output invariants. Chunks queued in the active run are owned by
    /// that run until it ends.
    pub fn replace(&mut self, index: usize, updated: Chunk) -> AppResult<()> {
        let position = self.position(index)?;
        if let Some(ref active) = self.active_run {
            if active.queue.contains(&index) {
                return Err(AppError::Consistency(format!(
                    "chunk {} is queued in run {} and cannot be replaced",
                    index, active.id
                )));
            }
        }
        if !self.chunks[position].same_identity(&updated) {
            return Err(AppError::Consistency(format!(
                "replacement for chunk {} changes its identity",
                index
            )));
        }
        self.put(position, updated)
    }

    /// Flip the inclusion of one chunk.
    pub fn toggle(&mut self, index: usize) -> AppResult<&Chunk> {
        let position = self.position(index)?;
        let current = &self.chunks[position];
        let next = self.inclusion_change(current, !current.included);
        self.put(position, next)?;
        Ok(&self.chunks[position])
    }

    /// Include one chunk in the next run (idempotent).
    pub fn select(&mut self, index: usize) -> AppResult<&Chunk> {
        let position = self.position(index)?;
        let next = self.inclusion_change(&self.chunks[position], true);
        self.put(position, next)?;
        Ok(&self.chunks[position])
    }

    /// Include every index in `indices`; nothing changes if one is unknown.
    pub fn select_indices(&mut self, indices: &[usize]) -> AppResult<()> {
        for &index in indices {
            self.position(index)?;
        }
        for &index in indices {
            self.select(index)?;
        }
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.set_all(true);
    }

    pub fn deselect_all(&mut self) {
        self.set_all(false);
    }

    /// Indices the next run would include, ascending.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.chunks
            .iter()
            .filter(|chunk| chunk.included)
            .map(|chunk| chunk.index)
            .collect()
    }

    /// Snapshot of the chunks the next run would include.
    pub fn selected(&self) -> Vec<Chunk> {
        self.chunks
            .iter()
            .filter(|chunk| chunk.included)
            .cloned()
            .collect()
    }

    /// Rewritten chunks in index order.
    pub fn rewritten(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.chunks
            .iter()
            .filter(|chunk| chunk.status == ChunkStatus::Rewritten)
    }

    pub fn summary(&self) -> StoreSummary {
        let mut summary = StoreSummary {
            total: self.chunks.len(),
            ..StoreSummary::default()
        };
        for chunk in &self.chunks {
            match chunk.status {
                ChunkStatus::Pending => summary.pending += 1,
                ChunkStatus::Selected => summary.selected += 1,
                ChunkStatus::InProgress => summary.in_progress += 1,
                ChunkStatus::Rewritten => summary.rewritten += 1,
                ChunkStatus::Failed => summary.failed += 1,
            }
            if chunk.included {
                summary.included += 1;
            }
        }
        summary
    }

    /// Return every chunk to `Pending`, discarding outputs and failures.
    pub fn reset(&mut self) -> AppResult<()> {
        if self.active_run.is_some() {
            return Err(AppError::Consistency(
                "cannot reset while a run is active".to_string(),
            ));
        }
        for position in 0..self.chunks.len() {
            let next = self.chunks[position].pending();
            self.put(position, next)?;
        }
        tracing::debug!("Reset {} chunks to pending", self.chunks.len());
        Ok(())
    }

    /// Claim the store for a run over `indices` and return the snapshot.
    ///
    /// Included rewritten or failed chunks are reset to `Selected` first.
    pub(crate) fn begin_run(&mut self, run_id: Uuid, indices: &[usize]) -> AppResult<Vec<Chunk>> {
        if let Some(ref active) = self.active_run {
            return Err(AppError::Consistency(format!(
                "run {} is already active",
                active.id
            )));
        }

        let mut positions = Vec::with_capacity(indices.len());
        for &index in indices {
            let position = self.position(index)?;
            let chunk = &self.chunks[position];
            if !chunk.included {
                return Err(AppError::Input(format!("chunk {} is not selected", index)));
            }
            if chunk.status == ChunkStatus::InProgress {
                return Err(AppError::Consistency(format!(
                    "chunk {} is already in progress",
                    index
                )));
            }
            positions.push(position);
        }

        let mut snapshot = Vec::with_capacity(positions.len());
        for position in positions {
            let next = self.chunks[position].reselected();
            self.put(position, next)?;
            snapshot.push(self.chunks[position].clone());
        }

        self.active_run = Some(ActiveRun {
            id: run_id,
            queue: indices.to_vec(),
        });
        Ok(snapshot)
    }

    pub(crate) fn mark_in_progress(&mut self, run_id: Uuid, index: usize) -> AppResult<Chunk> {
        let position = self.queued_position(run_id, index)?;
        if self
            .chunks
            .iter()
            .any(|chunk| chunk.status == ChunkStatus::InProgress)
        {
            return Err(AppError::Consistency(format!(
                "another chunk is in progress when starting chunk {}",
                index
            )));
        }
        let current = &self.chunks[position];
        if current.status != ChunkStatus::Selected {
            return Err(AppError::Consistency(format!(
                "chunk {} cannot start from {}",
                index, current.status
            )));
        }
        let next = current.started();
        self.put(position, next)?;
        Ok(self.chunks[position].clone())
    }

    pub(crate) fn mark_rewritten(
        &mut self,
        run_id: Uuid,
        index: usize,
        output: String,
    ) -> AppResult<Chunk> {
        let position = self.in_progress_position(run_id, index)?;
        let next = self.chunks[position].rewritten(output);
        self.put(position, next)?;
        Ok(self.chunks[position].clone())
    }

    pub(crate) fn mark_failed(&mut self, run_id: Uuid, index: usize, error: String) -> AppResult<Chunk> {
        let position = self.in_progress_position(run_id, index)?;
        let next = self.chunks[position].failed(error);
        self.put(position, next)?;
        Ok(self.chunks[position].clone())
    }

    /// Release the store. Queued chunks that never started take the status
    /// their inclusion flag asks for. A chunk still in progress (its run was
    /// dropped mid-call) goes back to `Selected` so the next run retries it.
    pub(crate) fn finish_run(&mut self, run_id: Uuid) {
        match self.active_run {
            Some(ref active) if active.id == run_id => {}
            _ => return,
        }
        let Some(active) = self.active_run.take() else {
            return;
        };

        for index in active.queue {
            let position = index - 1;
            let chunk = &self.chunks[position];
            match chunk.status {
                ChunkStatus::Selected if !chunk.included => {
                    self.chunks[position] = chunk.with_inclusion(false);
                }
                ChunkStatus::InProgress => {
                    tracing::warn!(run_id = %run_id, chunk = index, "Releasing unfinished chunk");
                    self.chunks[position] = if chunk.included {
                        chunk.reselected()
                    } else {
                        chunk.pending()
                    };
                }
                _ => {}
            }
        }
    }

    fn position(&self, index: usize) -> AppResult<usize> {
        if index == 0 || index > self.chunks.len() {
            return Err(AppError::Input(format!(
                "no chunk with index {} (store holds {})",
                index,
                self.chunks.len()
            )));
        }
        Ok(index - 1)
    }

    fn queued_position(&self, run_id: Uuid, index: usize) -> AppResult<usize> {
        match self.active_run {
            Some(ref active) if active.id == run_id && active.queue.contains(&index) => {
                self.position(index)
            }
            _ => Err(AppError::Consistency(format!(
                "chunk {} is not queued in run {}",
                index, run_id
            ))),
        }
    }

    fn in_progress_position(&self, run_id: Uuid, index: usize) -> AppResult<usize> {
        let position = self.queued_position(run_id, index)?;
        if self.chunks[position].status != ChunkStatus::InProgress {
            return Err(AppError::Consistency(format!(
                "chunk {} is {} rather than in progress",
                index, self.chunks[position].status
            )));
        }
        Ok(position)
    }

    /// Next record for an inclusion edit. Chunks queued in the active run keep
    /// their status so the run's snapshot is unaffected.
    fn inclusion_change(&self, current: &Chunk, included: bool) -> Chunk {
        let queued = self
            .active_run
            .as_ref()
            .is_some_and(|active| active.queue.contains(&current.index));

        if queued && current.status == ChunkStatus::Selected {
            let mut next = current.clone();
            next.included = included;
            next
        } else {
            current.with_inclusion(included)
        }
    }

    fn set_all(&mut self, included: bool) {
        for position in 0..self.chunks.len() {
            let next = self.inclusion_change(&self.chunks[position], included);
            self.chunks[position] = next;
        }
    }

    fn put(&mut self, position: usize, next: Chunk) -> AppResult<()> {
        if !self.is_queued_selection(&next) {
            next.check_invariants().map_err(AppError::Consistency)?;
        }
        self.chunks[position] = next;
        Ok(())
    }

    /// A queued chunk may sit at `Selected` without inclusion until its run ends.
    fn is_queued_selection(&self, chunk: &Chunk) -> bool {
        chunk.status == ChunkStatus::Selected
            && self
                .active_run
                .as_ref()
                .is_some_and(|active| active.queue.contains(&chunk.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(text: &str, max_words: usize) -> ChunkStore {
        ChunkStore::new(&Document::new("t", text), max_words).unwrap()
    }

    #[test]
    fn test_new_store_is_pending() {
        let store = store("w1 w2 w3 w4 w5", 2);
        assert_eq!(store.len(), 3);
        assert_eq!(store.summary().pending, 3);
        assert!(store.selected_indices().is_empty());
    }

    #[test]
    fn test_toggle_selects_and_deselects() {
        let mut store = store("w1 w2 w3 w4 w5", 2);

        assert_eq!(store.toggle(2).unwrap().status, ChunkStatus::Selected);
        assert_eq!(store.selected_indices(), vec![2]);

        assert_eq!(store.toggle(2).unwrap().status, ChunkStatus::Pending);
        assert!(store.selected_indices().is_empty());
    }

    #[test]
    fn test_toggle_leaves_other_chunks_alone() {
        let mut store = store("a b c d e f g h", 2);
        store.toggle(1).unwrap();
        let before: Vec<Chunk> = store.chunks().to_vec();

        store.toggle(3).unwrap();

        for (old, new) in before.iter().zip(store.chunks()) {
            if old.index != 3 {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn test_unknown_index_is_input_error() {
        let mut store = store("w1 w2", 2);
        assert!(store.toggle(0).unwrap_err().is_input());
        assert!(store.toggle(2).unwrap_err().is_input());
        assert!(store.get(5).is_none());
    }

    #[test]
    fn test_select_indices_is_all_or_nothing() {
        let mut store = store("w1 w2 w3 w4 w5", 2);
        assert!(store.select_indices(&[1, 9]).is_err());
        assert!(store.selected_indices().is_empty());

        store.select_indices(&[3, 1]).unwrap();
        assert_eq!(store.selected_indices(), vec![1, 3]);
    }

    #[test]
    fn test_select_all_and_deselect_all_keep_outputs() {
        let mut store = store("w1 w2 w3 w4", 2);
        let run = Uuid::new_v4();
        store.select(1).unwrap();
        store.begin_run(run, &[1]).unwrap();
        store.mark_in_progress(run, 1).unwrap();
        store.mark_rewritten(run, 1, "W1 W2".to_string()).unwrap();
        store.finish_run(run);

        store.select_all();
        assert_eq!(store.selected_indices(), vec![1, 2]);
        assert_eq!(store.get(1).unwrap().status, ChunkStatus::Rewritten);
        assert_eq!(store.get(1).unwrap().output.as_deref(), Some("W1 W2"));

        store.deselect_all();
        assert!(store.selected_indices().is_empty());
        assert_eq!(store.get(1).unwrap().output.as_deref(), Some("W1 W2"));
        assert_eq!(store.get(2).unwrap().status, ChunkStatus::Pending);
    }

    #[test]
    fn test_replace_rejects_identity_change() {
        let mut store = store("w1 w2 w3", 2);
        let mut changed = store.get(1).unwrap().clone();
        changed.text = "other".to_string();

        assert!(store.replace(1, changed).unwrap_err().is_consistency());
    }

    #[test]
    fn test_replace_rejects_broken_invariant() {
        let mut store = store("w1 w2 w3", 2);
        let mut changed = store.get(1).unwrap().clone();
        changed.output = Some("sneaky".to_string());

        assert!(store.replace(1, changed).unwrap_err().is_consistency());
    }

    #[test]
    fn test_replace_whole_record() {
        let mut store = store("w1 w2 w3", 2);
        let updated = store.get(2).unwrap().with_inclusion(true);

        store.replace(2, updated).unwrap();
        assert_eq!(store.get(2).unwrap().status, ChunkStatus::Selected);
    }

    #[test]
    fn test_from_chunks_requires_contiguous_indices() {
        let mut chunks = store("a b c d", 1).chunks().to_vec();
        chunks.remove(1);

        let err = ChunkStore::from_chunks("fp", chunks).unwrap_err();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_begin_run_resets_rewritten_chunks() {
        let mut store = store("w1 w2 w3 w4", 2);
        let first = Uuid::new_v4();
        store.select(1).unwrap();
        store.begin_run(first, &[1]).unwrap();
        store.mark_in_progress(first, 1).unwrap();
        store.mark_rewritten(first, 1, "W1 W2".to_string()).unwrap();
        store.finish_run(first);

        store.toggle(1).unwrap();
        let second = Uuid::new_v4();
        let snapshot = store.begin_run(second, &[1]).unwrap();

        assert_eq!(snapshot[0].status, ChunkStatus::Selected);
        assert_eq!(snapshot[0].output, None);
        assert_eq!(store.get(1).unwrap().output, None);
    }

    #[test]
    fn test_begin_run_rejects_unselected_and_concurrent_runs() {
        let mut store = store("w1 w2 w3 w4", 2);
        assert!(store.begin_run(Uuid::new_v4(), &[1]).unwrap_err().is_input());

        store.select_all();
        store.begin_run(Uuid::new_v4(), &[1]).unwrap();
        assert!(store
            .begin_run(Uuid::new_v4(), &[2])
            .unwrap_err()
            .is_consistency());
        assert!(store.reset().unwrap_err().is_consistency());
    }

    #[test]
    fn test_deselect_during_run_does_not_touch_queue() {
        let mut store = store("w1 w2 w3 w4", 2);
        let run = Uuid::new_v4();
        store.select_all();
        store.begin_run(run, &[1, 2]).unwrap();

        store.toggle(2).unwrap();
        assert_eq!(store.get(2).unwrap().status, ChunkStatus::Selected);
        assert!(!store.get(2).unwrap().included);

        store.mark_in_progress(run, 1).unwrap();
        store.mark_failed(run, 1, "boom".to_string()).unwrap();
        store.finish_run(run);

        assert_eq!(store.get(2).unwrap().status, ChunkStatus::Pending);
        assert_eq!(store.get(1).unwrap().status, ChunkStatus::Failed);
        assert_eq!(store.selected_indices(), vec![1]);
    }

    #[test]
    fn test_only_one_chunk_in_progress() {
        let mut store = store("w1 w2 w3 w4", 2);
        let run = Uuid::new_v4();
        store.select_all();
        store.begin_run(run, &[1, 2]).unwrap();
        store.mark_in_progress(run, 1).unwrap();

        assert!(store.mark_in_progress(run, 2).unwrap_err().is_consistency());
    }

    #[test]
    fn test_replace_rejects_queued_chunk_during_run() {
        let mut store = store("w1 w2 w3 w4 w5 w6", 2);
        let run = Uuid::new_v4();
        store.select_indices(&[1, 2]).unwrap();
        store.begin_run(run, &[1, 2]).unwrap();

        let mut stale = store.get(2).unwrap().clone();
        stale.status = ChunkStatus::Pending;
        stale.included = false;
        assert!(store.replace(2, stale).unwrap_err().is_consistency());
        assert_eq!(store.get(2).unwrap().status, ChunkStatus::Selected);

        let outside = store.get(3).unwrap().with_inclusion(true);
        store.replace(3, outside).unwrap();

        store.mark_in_progress(run, 1).unwrap();
        store.mark_rewritten(run, 1, "W1 W2".to_string()).unwrap();
        store.mark_in_progress(run, 2).unwrap();
        store.finish_run(run);

        let after = store.get(2).unwrap().with_inclusion(false);
        assert!(store.replace(2, after).is_ok());
    }

    #[test]
    fn test_finish_run_releases_unfinished_chunk() {
        let mut store = store("w1 w2 w3 w4 w5 w6", 2);
        let run = Uuid::new_v4();
        store.select_all();
        store.begin_run(run, &[1, 2, 3]).unwrap();
        store.mark_in_progress(run, 1).unwrap();
        store.toggle(2).unwrap();

        store.finish_run(run);

        assert!(!store.is_running());
        assert_eq!(store.summary().in_progress, 0);
        assert_eq!(store.get(1).unwrap().status, ChunkStatus::Selected);
        assert_eq!(store.get(2).unwrap().status, ChunkStatus::Pending);
        assert_eq!(store.selected_indices(), vec![1, 3]);
        store.reset().unwrap();
    }

    #[test]
    fn test_finish_run_returns_deselected_unfinished_chunk_to_pending() {
        let mut store = store("w1 w2", 1);
        let run = Uuid::new_v4();
        store.select_all();
        store.begin_run(run, &[1, 2]).unwrap();
        store.mark_in_progress(run, 1).unwrap();
        store.toggle(1).unwrap();

        store.finish_run(run);

        assert_eq!(store.get(1).unwrap().status, ChunkStatus::Pending);
        assert!(!store.get(1).unwrap().included);
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut store = store("w1 w2 w3 w4", 2);
        let run = Uuid::new_v4();
        store.select_all();
        store.begin_run(run, &[1, 2]).unwrap();
        store.mark_in_progress(run, 1).unwrap();
        store.mark_rewritten(run, 1, "W1 W2".to_string()).unwrap();
        store.finish_run(run);

        store.reset().unwrap();
        let summary = store.summary();
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.included, 0);
        assert!(store.rewritten().next().is_none());
    }
}
