//! Anthropic messages API provider.

use super::{error_from_response, http_client};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use redraft_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: &str = "2023-06-01";

/// The messages API requires `max_tokens`.
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Claude LLM client.
pub struct ClaudeClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ClaudeClient {
    /// Create a client for the public Anthropic endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.anthropic.com", api_key)
    }

    /// Create a client for a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Replace the HTTP client with one that enforces `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = http_client(Some(timeout))?;
        Ok(self)
    }

    fn to_messages_request(&self, request: &LlmRequest) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system.clone(),
            messages: vec![Message {
                role: "user",
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }

    fn convert_response(&self, response: MessagesResponse) -> AppResult<LlmResponse> {
        let content: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if content.is_empty() {
            return Err(AppError::Llm(
                "Claude response contained no text blocks".to_string(),
            ));
        }

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model,
            usage,
            done: response.stop_reason.as_deref() != Some("max_tokens"),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for ClaudeClient {
    fn provider_name(&self) -> &str {
        "claude"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending completion request to Claude");

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.to_messages_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Claude: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response("Claude", response).await);
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Claude response: {}", e)))?;

        self.convert_response(messages_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max_tokens() {
        let client = ClaudeClient::new("key");
        let request = client.to_messages_request(&LlmRequest::new("Hi", "claude-3-5-haiku"));
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_convert_response_joins_text_blocks() {
        let client = ClaudeClient::new("key");
        let raw = r#"{
            "model": "claude-3-5-haiku",
            "content": [{"type": "text", "text": "Part one. "}, {"type": "text", "text": "Part two."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 8, "output_tokens": 4}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();

        let response = client.convert_response(parsed).unwrap();
        assert_eq!(response.content, "Part one. Part two.");
        assert!(response.done);
        assert_eq!(response.usage.total_tokens, 12);
    }

    #[test]
    fn test_convert_response_without_text() {
        let client = ClaudeClient::new("key");
        let parsed: MessagesResponse =
            serde_json::from_str(r#"{"model": "m", "content": []}"#).unwrap();
        assert!(client.convert_response(parsed).is_err());
    }
}
