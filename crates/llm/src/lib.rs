//! LLM integration crate for Redraft.
//!
//! This crate provides a provider-agnostic abstraction for sending one
//! completion request to a Large Language Model and awaiting the full answer.
//! The rewrite pipeline only ever needs request/response calls, so there is
//! no streaming surface.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Chat completions API (and compatible gateways)
//! - **Claude**: Anthropic messages API
//! - **Mock**: In-process provider for tests and dry runs
//!
//! # Example
//! ```no_run
//! use redraft_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Rewrite: the cat sat", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{ClaudeClient, MockClient, OllamaClient, OpenAiClient};
pub use types::ProviderType;
