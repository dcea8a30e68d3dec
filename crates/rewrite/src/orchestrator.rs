//! Sequential rewrite orchestration.
//!
//! A run snapshots its chunk list, then walks it strictly in ascending index
//! order with exactly one outstanding call to the rewrite service:
//!
//! ```text
//! for chunk in snapshot:
//!     cancelled?        -> Cancelled { next_index: chunk }
//!     mark InProgress
//!     service.rewrite   (the only await on the remote side)
//!     ok                -> mark Rewritten, continue
//!     err               -> mark Failed, Aborted { at_index: chunk }
//! ```
//!
//! A failed rewrite is recorded on its chunk and reported through the
//! outcome; it never surfaces as an `Err` from [`Orchestrator::run`].
//!
//! The store stays claimed for the lifetime of the run. Dropping the run
//! future (a timeout, a lost `select!` branch, an aborted task) releases the
//! claim and returns the interrupted chunk to the selection.

use crate::progress::{RunEvent, RunReporter};
use crate::service::{RewriteRequest, RewriteService};
use crate::store::SharedChunkStore;
use crate::types::{Chunk, RunOutcome};
use chrono::{DateTime, Utc};
use redraft_core::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What to do with the selected chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Natural-language instruction shared by every chunk in the run
    pub instruction: String,

    /// Provider identifier passed through to the rewrite service
    pub provider: String,
}

impl RunRequest {
    pub fn new(instruction: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            provider: provider.into(),
        }
    }
}

/// The chunk that stopped a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub index: usize,
    pub error: String,
}

/// Summary of one finished run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub instruction: String,
    pub provider: String,

    /// Chunk indices captured at run start, ascending
    pub submitted: Vec<usize>,

    /// Chunk indices rewritten by this run
    pub rewritten: Vec<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ChunkFailure>,

    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Submitted chunks the run never attempted.
    pub fn not_attempted(&self) -> Vec<usize> {
        let attempted = self.rewritten.len() + usize::from(self.failure.is_some());
        self.submitted.iter().skip(attempted).copied().collect()
    }
}

/// Drives one rewrite run at a time over a shared chunk store.
pub struct Orchestrator {
    service: Arc<dyn RewriteService>,
    reporter: RunReporter,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn RewriteService>) -> Self {
        Self {
            service,
            reporter: RunReporter::noop(),
        }
    }

    /// Send run events to `reporter`.
    pub fn with_reporter(mut self, reporter: RunReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run over whatever the store currently has selected.
    pub async fn run_selection(
        &self,
        store: &SharedChunkStore,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> AppResult<RunReport> {
        let indices = store.read().await.selected_indices();
        self.run(store, &indices, request, cancel).await
    }

    /// Rewrite the chunks at `indices` under one instruction.
    ///
    /// # Errors
    /// - `AppError::Input` for an empty or unordered selection, a blank
    ///   instruction or provider, an unsupported provider, or a chunk that is
    ///   not selected. Nothing is called and nothing changes.
    /// - `AppError::Consistency` when another run holds the store or a chunk
    ///   record breaks its invariants.
    pub async fn run(
        &self,
        store: &SharedChunkStore,
        indices: &[usize],
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> AppResult<RunReport> {
        self.validate(indices, request)?;

        let run_id = Uuid::new_v4();
        let snapshot = store.write().await.begin_run(run_id, indices)?;
        let claim = RunClaim::new(store, run_id);
        let started_at = Utc::now();

        tracing::info!(
            run_id = %run_id,
            provider = %request.provider,
            chunks = snapshot.len(),
            "Starting rewrite run"
        );
        self.reporter.emit(RunEvent::RunStarted {
            run_id,
            provider: request.provider.clone(),
            total: snapshot.len(),
        });

        let mut progress = RunProgress::default();
        let driven = self
            .drive(store, run_id, &snapshot, request, cancel, &mut progress)
            .await;
        claim.release().await;
        let outcome = driven?;

        tracing::info!(
            run_id = %run_id,
            outcome = %outcome,
            rewritten = progress.rewritten.len(),
            "Rewrite run finished"
        );
        self.reporter.emit(RunEvent::RunFinished {
            outcome,
            rewritten: progress.rewritten.len(),
        });

        Ok(RunReport {
            run_id,
            instruction: request.instruction.trim().to_string(),
            provider: request.provider.clone(),
            submitted: indices.to_vec(),
            rewritten: progress.rewritten,
            failure: progress.failure,
            outcome,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn validate(&self, indices: &[usize], request: &RunRequest) -> AppResult<()> {
        if indices.is_empty() {
            return Err(AppError::Input("no chunks selected".to_string()));
        }
        if !indices.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(AppError::Input(format!(
                "chunk indices must be strictly ascending: {:?}",
                indices
            )));
        }
        if request.instruction.trim().is_empty() {
            return Err(AppError::Input("instruction is blank".to_string()));
        }
        if request.provider.trim().is_empty() {
            return Err(AppError::Input("provider is blank".to_string()));
        }
        if !self.service.supports_provider(&request.provider) {
            return Err(AppError::Input(format!(
                "provider not supported: {}",
                request.provider
            )));
        }
        Ok(())
    }

    async fn drive(
        &self,
        store: &SharedChunkStore,
        run_id: Uuid,
        snapshot: &[Chunk],
        request: &RunRequest,
        cancel: &CancellationToken,
        progress: &mut RunProgress,
    ) -> AppResult<RunOutcome> {
        let total = snapshot.len();
        let instruction = request.instruction.trim();

        for (offset, chunk) in snapshot.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(run_id = %run_id, next_index = chunk.index, "Rewrite run cancelled");
                self.reporter.emit(RunEvent::RunCancelled {
                    next_index: chunk.index,
                });
                return Ok(RunOutcome::Cancelled {
                    next_index: chunk.index,
                });
            }

            let position = offset + 1;
            store.write().await.mark_in_progress(run_id, chunk.index)?;
            tracing::debug!(chunk = chunk.index, position, total, "Rewriting chunk");
            self.reporter.emit(RunEvent::ChunkStarted {
                index: chunk.index,
                position,
                total,
            });

            // Blank output counts as a malformed response for every service.
            let call = RewriteRequest::new(chunk.text.clone(), instruction, request.provider.clone());
            let result = self.service.rewrite(&call).await.and_then(|response| {
                if response.rewritten_text.trim().is_empty() {
                    Err(AppError::Transform(
                        "rewrite service returned empty text".to_string(),
                    ))
                } else {
                    Ok(response.rewritten_text)
                }
            });

            match result {
                Ok(output) => {
                    store
                        .write()
                        .await
                        .mark_rewritten(run_id, chunk.index, output)?;
                    tracing::debug!(chunk = chunk.index, "Chunk rewritten");
                    self.reporter.emit(RunEvent::ChunkRewritten {
                        index: chunk.index,
                        position,
                        total,
                    });
                    progress.rewritten.push(chunk.index);
                }
                Err(e) => {
                    let error = e.to_string();
                    store
                        .write()
                        .await
                        .mark_failed(run_id, chunk.index, error.clone())?;
                    tracing::warn!(chunk = chunk.index, error = %error, "Chunk rewrite failed");
                    self.reporter.emit(RunEvent::ChunkFailed {
                        index: chunk.index,
                        error: error.clone(),
                    });
                    progress.failure = Some(ChunkFailure {
                        index: chunk.index,
                        error,
                    });
                    return Ok(RunOutcome::Aborted {
                        at_index: chunk.index,
                    });
                }
            }
        }

        Ok(RunOutcome::Completed)
    }
}

#[derive(Debug, Default)]
struct RunProgress {
    rewritten: Vec<usize>,
    failure: Option<ChunkFailure>,
}

/// A run's hold on the store, released on completion or on drop.
struct RunClaim {
    store: SharedChunkStore,
    run_id: Uuid,
    released: bool,
}

impl RunClaim {
    fn new(store: &SharedChunkStore, run_id: Uuid) -> Self {
        Self {
            store: Arc::clone(store),
            run_id,
            released: false,
        }
    }

    async fn release(mut self) {
        self.store.write().await.finish_run(self.run_id);
        self.released = true;
    }
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!(run_id = %self.run_id, "Rewrite run dropped before finishing");

        // The run never holds the lock across an await, so this only fails
        // when another task is mid-edit.
        if let Ok(mut store) = self.store.try_write() {
            store.finish_run(self.run_id);
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                let run_id = self.run_id;
                handle.spawn(async move {
                    store.write().await.finish_run(run_id);
                });
            }
            Err(_) => {
                tracing::error!(run_id = %self.run_id, "No runtime to release the chunk store");
            }
        }
    }
}
