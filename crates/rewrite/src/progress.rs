//! Run progress reporting.
//!
//! The orchestrator emits one [`RunEvent`] per state change, in the order the
//! changes happen, so an observer never sees chunk k+1 start before chunk k
//! has finished.

use crate::types::RunOutcome;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Event emitted during an orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RunEvent {
    RunStarted {
        run_id: Uuid,
        provider: String,
        total: usize,
    },
    ChunkStarted {
        index: usize,
        /// 1-based position within the run
        position: usize,
        total: usize,
    },
    ChunkRewritten {
        index: usize,
        position: usize,
        total: usize,
    },
    ChunkFailed {
        index: usize,
        error: String,
    },
    RunCancelled {
        next_index: usize,
    },
    RunFinished {
        outcome: RunOutcome,
        rewritten: usize,
    },
}

impl RunEvent {
    /// Chunk index the event is keyed by, if any.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            Self::ChunkStarted { index, .. }
            | Self::ChunkRewritten { index, .. }
            | Self::ChunkFailed { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        match self {
            Self::RunStarted {
                provider, total, ..
            } => format!("[run] rewriting {} chunk(s) with {}", total, provider),
            Self::ChunkStarted {
                index,
                position,
                total,
            } => format!("[chunk {}] {}/{} rewriting...", index, position, total),
            Self::ChunkRewritten {
                index,
                position,
                total,
            } => format!("[chunk {}] {}/{} rewritten", index, position, total),
            Self::ChunkFailed { index, error } => format!("[chunk {}] failed: {}", index, error),
            Self::RunCancelled { next_index } => {
                format!("[run] cancelled before chunk {}", next_index)
            }
            Self::RunFinished {
                outcome, rewritten, ..
            } => format!("[run] {} ({} rewritten)", outcome, rewritten),
        }
    }
}

/// Callback for run events.
pub type RunCallback = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Reporter that mirrors run events to `tracing` and an optional callback.
#[derive(Clone)]
pub struct RunReporter {
    callback: Option<RunCallback>,
    start_time: Arc<Instant>,
}

impl RunReporter {
    pub fn new(callback: RunCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Arc::new(Instant::now()),
        }
    }

    /// Create a reporter that only logs.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Arc::new(Instant::now()),
        }
    }

    pub fn emit(&self, event: RunEvent) {
        tracing::debug!(
            chunk = ?event.chunk_index(),
            elapsed_secs = self.start_time.elapsed().as_secs_f64(),
            "{}",
            event.format_simple()
        );

        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::noop()
    }
}
