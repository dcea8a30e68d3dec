//! Provider implementations of [`LlmClient`](crate::LlmClient).

mod claude;
mod mock;
mod ollama;
mod openai;

pub use claude::ClaudeClient;
pub use mock::{MockClient, MockMode};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use redraft_core::{AppError, AppResult};
use std::time::Duration;

/// Build the HTTP client shared by the remote providers.
fn http_client(timeout: Option<Duration>) -> AppResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success HTTP response into an `AppError::Llm`.
async fn error_from_response(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    AppError::Llm(format!("{} API error ({}): {}", provider, status, error_text))
}
