//! Chunk records and run outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a chunk.
///
/// Within one run a chunk only moves forward:
/// `Selected -> InProgress -> Rewritten | Failed`.
/// `Pending` and `Selected` are interchangeable through selection edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChunkStatus {
    Pending,
    Selected,
    InProgress,
    Rewritten,
    Failed,
}

impl ChunkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Selected => "selected",
            Self::InProgress => "in-progress",
            Self::Rewritten => "rewritten",
            Self::Failed => "failed",
        }
    }

    /// Whether a run has finished with this chunk.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rewritten | Self::Failed)
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bounded, ordered segment of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 1-based position, stable for the lifetime of a chunking run
    pub index: usize,

    /// The chunk's words joined by single spaces
    pub text: String,

    /// Number of words in `text`
    pub word_count: usize,

    /// Word positions covered in the source document (0-based, end exclusive)
    pub word_range: (usize, usize),

    /// Byte range covered in the source document text
    pub byte_range: (usize, usize),

    pub status: ChunkStatus,

    /// Whether the chunk takes part in the next run
    #[serde(default)]
    pub included: bool,

    /// Rewritten text, present only when `status` is `Rewritten`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Failure message, present only when `status` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Chunk {
    /// Create a pending chunk.
    pub fn new(
        index: usize,
        text: String,
        word_count: usize,
        word_range: (usize, usize),
        byte_range: (usize, usize),
    ) -> Self {
        Self {
            index,
            text,
            word_count,
            word_range,
            byte_range,
            status: ChunkStatus::Pending,
            included: false,
            output: None,
            error: None,
        }
    }

    /// Whether `other` describes the same span of the same chunking.
    pub fn same_identity(&self, other: &Chunk) -> bool {
        self.index == other.index
            && self.text == other.text
            && self.word_count == other.word_count
            && self.word_range == other.word_range
            && self.byte_range == other.byte_range
    }

    /// Check the status/field invariants of a single record.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if self.output.is_some() != (self.status == ChunkStatus::Rewritten) {
            return Err(format!(
                "chunk {} is {} but output is {}",
                self.index,
                self.status,
                if self.output.is_some() { "set" } else { "missing" }
            ));
        }
        if self.error.is_some() && self.status != ChunkStatus::Failed {
            return Err(format!(
                "chunk {} carries an error while {}",
                self.index, self.status
            ));
        }
        match (self.status, self.included) {
            (ChunkStatus::Pending, true) => Err(format!(
                "chunk {} is pending but included",
                self.index
            )),
            (ChunkStatus::Selected, false) => Err(format!(
                "chunk {} is selected but not included",
                self.index
            )),
            _ => Ok(()),
        }
    }

    /// Copy with the inclusion flag set to `included`.
    ///
    /// Pending and selected chunks follow the flag with their status; chunks
    /// with any other status only change the flag.
    pub(crate) fn with_inclusion(&self, included: bool) -> Chunk {
        let mut next = self.clone();
        next.included = included;
        next.status = match (self.status, included) {
            (ChunkStatus::Pending, true) => ChunkStatus::Selected,
            (ChunkStatus::Selected, false) => ChunkStatus::Pending,
            (status, _) => status,
        };
        next
    }

    /// Copy reset to `Selected` with output and error cleared.
    pub(crate) fn reselected(&self) -> Chunk {
        Chunk {
            status: ChunkStatus::Selected,
            included: true,
            output: None,
            error: None,
            ..self.clone()
        }
    }

    pub(crate) fn started(&self) -> Chunk {
        Chunk {
            status: ChunkStatus::InProgress,
            ..self.clone()
        }
    }

    /// Rewritten chunks leave the selection.
    pub(crate) fn rewritten(&self, output: String) -> Chunk {
        Chunk {
            status: ChunkStatus::Rewritten,
            included: false,
            output: Some(output),
            error: None,
            ..self.clone()
        }
    }

    /// Failed chunks stay included so the same selection retries them.
    pub(crate) fn failed(&self, error: String) -> Chunk {
        Chunk {
            status: ChunkStatus::Failed,
            output: None,
            error: Some(error),
            ..self.clone()
        }
    }

    /// Copy returned to `Pending` with everything but its identity cleared.
    pub(crate) fn pending(&self) -> Chunk {
        Chunk {
            status: ChunkStatus::Pending,
            included: false,
            output: None,
            error: None,
            ..self.clone()
        }
    }
}

/// Terminal outcome of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RunOutcome {
    /// Every submitted chunk was rewritten
    Completed,

    /// The chunk at `at_index` failed; later chunks were not attempted
    Aborted {
        #[serde(rename = "atIndex")]
        at_index: usize,
    },

    /// Cancellation took effect before the chunk at `next_index` started
    Cancelled {
        #[serde(rename = "nextIndex")]
        next_index: usize,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Aborted { at_index } => write!(f, "aborted at chunk {}", at_index),
            Self::Cancelled { next_index } => write!(f, "cancelled before chunk {}", next_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> Chunk {
        Chunk::new(1, "w1 w2".to_string(), 2, (0, 2), (0, 5))
    }

    #[test]
    fn test_inclusion_moves_pending_and_selected() {
        let selected = chunk().with_inclusion(true);
        assert_eq!(selected.status, ChunkStatus::Selected);
        assert!(selected.included);

        let pending = selected.with_inclusion(false);
        assert_eq!(pending.status, ChunkStatus::Pending);
        assert!(!pending.included);
    }

    #[test]
    fn test_inclusion_keeps_rewritten_output() {
        let done = chunk().with_inclusion(true).started().rewritten("W1 W2".to_string());
        let toggled = done.with_inclusion(true);

        assert_eq!(toggled.status, ChunkStatus::Rewritten);
        assert_eq!(toggled.output.as_deref(), Some("W1 W2"));
        assert!(toggled.included);
    }

    #[test]
    fn test_invariants() {
        assert!(chunk().check_invariants().is_ok());

        let mut broken = chunk();
        broken.output = Some("stray".to_string());
        assert!(broken.check_invariants().is_err());

        let mut broken = chunk();
        broken.status = ChunkStatus::Selected;
        assert!(broken.check_invariants().is_err());

        let failed = chunk().with_inclusion(true).started().failed("boom".to_string());
        assert!(failed.check_invariants().is_ok());
        assert!(failed.included);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(RunOutcome::Aborted { at_index: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "aborted", "atIndex": 3}));
        assert_eq!(RunOutcome::Aborted { at_index: 3 }.to_string(), "aborted at chunk 3");
    }
}
