//! The rewrite service seam.
//!
//! The orchestrator only knows [`RewriteService`]: text and instructions in,
//! rewritten text out. [`LlmRewriteService`] implements it on top of the
//! completion providers in `redraft-llm` and the rewrite prompt in
//! `redraft-prompt`.

use redraft_core::{config::AppConfig, AppError, AppResult};
use redraft_llm::{create_client, LlmClient, LlmRequest, ProviderType};
use redraft_prompt::{build_rewrite_prompt, resolve_prompt, PromptDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One rewrite call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub text: String,
    pub instructions: String,
    pub provider: String,
}

impl RewriteRequest {
    pub fn new(
        text: impl Into<String>,
        instructions: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            instructions: instructions.into(),
            provider: provider.into(),
        }
    }
}

/// Successful rewrite result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResponse {
    pub rewritten_text: String,
}

/// External text transformation dependency.
///
/// Any error is treated as a failed rewrite; implementations never hand back
/// partial text together with an error. The orchestrator also fails a chunk
/// whose rewritten text is blank.
#[async_trait::async_trait]
pub trait RewriteService: Send + Sync {
    /// Whether `provider` can be served. Checked before a run starts.
    fn supports_provider(&self, _provider: &str) -> bool {
        true
    }

    /// Rewrite one passage. Awaited in full; there is no streaming.
    async fn rewrite(&self, request: &RewriteRequest) -> AppResult<RewriteResponse>;
}

/// A completion client plus the model it is asked for.
#[derive(Clone)]
struct ProviderBinding {
    client: Arc<dyn LlmClient>,
    model: String,
}

/// [`RewriteService`] backed by LLM completion providers.
#[derive(Clone)]
pub struct LlmRewriteService {
    prompt: PromptDefinition,
    providers: HashMap<String, ProviderBinding>,
}

impl LlmRewriteService {
    /// Create a service rendering `prompt`, with no providers registered.
    pub fn new(prompt: PromptDefinition) -> Self {
        Self {
            prompt,
            providers: HashMap::new(),
        }
    }

    /// Register `client` under `provider`, asking it for `model`.
    pub fn with_provider(
        mut self,
        provider: &str,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> Self {
        self.providers.insert(
            canonical_provider(provider),
            ProviderBinding {
                client,
                model: model.into(),
            },
        );
        self
    }

    /// Build the service from application configuration.
    ///
    /// The active provider must be constructible. Other configured providers
    /// are registered when their credentials resolve and skipped otherwise.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let prompt = resolve_prompt(&config.workspace, &config.prompt_id)?;
        let mut service = Self::new(prompt);

        let active = canonical_provider(&config.provider);
        let client = client_for(config, &config.provider)?;
        service = service.with_provider(&active, client, config.model.clone());

        if let Some(ref llm) = config.llm {
            for (name, settings) in &llm.providers {
                if canonical_provider(name) == active {
                    continue;
                }
                match client_for(config, name) {
                    Ok(client) => {
                        service = service.with_provider(name, client, settings.model.clone());
                    }
                    Err(e) => {
                        tracing::debug!(provider = %name, "Skipping provider: {}", e);
                    }
                }
            }
        }

        tracing::debug!(
            prompt = %service.prompt.id,
            providers = ?service.providers.keys().collect::<Vec<_>>(),
            "Rewrite service ready"
        );

        Ok(service)
    }

    /// Canonical identifiers of the registered providers, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn prompt(&self) -> &PromptDefinition {
        &self.prompt
    }
}

#[async_trait::async_trait]
impl RewriteService for LlmRewriteService {
    fn supports_provider(&self, provider: &str) -> bool {
        self.providers.contains_key(&canonical_provider(provider))
    }

    async fn rewrite(&self, request: &RewriteRequest) -> AppResult<RewriteResponse> {
        let binding = self
            .providers
            .get(&canonical_provider(&request.provider))
            .ok_or_else(|| {
                AppError::Input(format!("Provider not configured: {}", request.provider))
            })?;

        let built = build_rewrite_prompt(&self.prompt, &request.text, &request.instructions)
            .map_err(|e| AppError::Transform(e.to_string()))?;

        let mut llm_request = LlmRequest::new(built.user, binding.model.clone());
        if let Some(system) = built.system {
            llm_request = llm_request.with_system(system);
        }

        tracing::trace!(
            provider = binding.client.provider_name(),
            model = %binding.model,
            "Sending rewrite request"
        );

        let response = binding
            .client
            .complete(&llm_request)
            .await
            .map_err(|e| AppError::Transform(e.to_string()))?;

        if !response.done {
            return Err(AppError::Transform(
                "provider returned an incomplete response".to_string(),
            ));
        }

        Ok(RewriteResponse {
            rewritten_text: response.content.trim().to_string(),
        })
    }
}

/// Canonical name for a provider identifier (`anthropic` becomes `claude`).
fn canonical_provider(provider: &str) -> String {
    ProviderType::parse(provider)
        .map(|provider_type| provider_type.as_str().to_string())
        .unwrap_or_else(|| provider.trim().to_lowercase())
}

fn client_for(config: &AppConfig, provider: &str) -> AppResult<Arc<dyn LlmClient>> {
    let timeout = config
        .provider_settings(provider)
        .and_then(|settings| settings.timeout)
        .map(Duration::from_secs);
    let api_key = config.resolve_api_key(provider);

    create_client(
        provider,
        config.provider_endpoint(provider),
        api_key.as_deref(),
        timeout,
    )
}
