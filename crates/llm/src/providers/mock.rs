//! Mock LLM provider.
//!
//! Answers in-process without any network access. `MockMode::Echo` returns
//! the rendered prompt unchanged, which makes `--provider mock` a dry run
//! that shows exactly what would be sent.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use redraft_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// How the mock answers.
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Return the prompt text unchanged
    Echo,
    /// Return a fixed reply
    Reply(String),
    /// Fail every call with the given message
    Fail(String),
}

/// Mock provider for testing and offline runs.
#[derive(Debug)]
pub struct MockClient {
    mode: MockMode,
    calls: AtomicUsize,
}

impl MockClient {
    /// Create a mock answering in `mode`.
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new(MockMode::Echo)
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let content = match &self.mode {
            MockMode::Echo => request.prompt.clone(),
            MockMode::Reply(reply) => reply.clone(),
            MockMode::Fail(message) => return Err(AppError::Llm(message.clone())),
        };

        let prompt_words = request.prompt.split_whitespace().count() as u32;
        let completion_words = content.split_whitespace().count() as u32;

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(prompt_words, completion_words),
            done: true,
        })
    }
}
