//! LLM provider factory.
//!
//! This module creates LLM clients from a provider identifier, resolving
//! default endpoints and checking that hosted providers received a key.

use crate::client::LlmClient;
use crate::providers::{ClaudeClient, MockClient, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use redraft_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "claude", "ollama", "mock")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (required for hosted providers)
/// * `timeout` - Optional per-request timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let base_url = endpoint
        .or_else(|| provider_type.default_endpoint())
        .unwrap_or_default();

    let api_key = match (provider_type.requires_api_key(), api_key) {
        (true, None) => {
            return Err(AppError::Config(format!(
                "{} provider requires API key",
                provider_type.as_str()
            )))
        }
        (_, key) => key.unwrap_or_default(),
    };

    tracing::debug!(provider = provider_type.as_str(), %base_url, "Creating LLM client");

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => match timeout {
            Some(timeout) => Arc::new(OllamaClient::with_timeout(base_url, timeout)?),
            None => Arc::new(OllamaClient::with_base_url(base_url)),
        },
        ProviderType::OpenAI => {
            let client = OpenAiClient::with_base_url(base_url, api_key);
            match timeout {
                Some(timeout) => Arc::new(client.timeout(timeout)?),
                None => Arc::new(client),
            }
        }
        ProviderType::Claude => {
            let client = ClaudeClient::with_base_url(base_url, api_key);
            match timeout {
                Some(timeout) => Arc::new(client.timeout(timeout)?),
                None => Arc::new(client),
            }
        }
        ProviderType::Mock => Arc::new(MockClient::default()),
    };

    Ok(client)
}
