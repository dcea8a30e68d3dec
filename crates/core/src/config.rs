//! Configuration management for Redraft.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.redraft/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with prompt templates and the
//! config file stored in `.redraft/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Provider identifiers accepted by `validate`.
pub const KNOWN_PROVIDERS: [&str; 5] = ["ollama", "openai", "claude", "anthropic", "mock"];

/// Default word bound for rewrite chunking.
pub const DEFAULT_REWRITE_MAX_WORDS: usize = 500;

/// Default word bound for read-only display chunking.
pub const DEFAULT_DISPLAY_MAX_WORDS: usize = 1000;

/// Default rewrite prompt identifier.
pub const DEFAULT_PROMPT_ID: &str = "rewrite.default";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .redraft/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default rewrite provider (e.g., "openai", "claude", "ollama")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key override for the active provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Chunk size bounds
    pub chunking: ChunkingConfig,

    /// Rewrite prompt identifier
    pub prompt_id: String,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

/// Settings for one provider, keyed by provider identifier in `LlmConfig`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Model used for rewrites
    pub model: String,

    /// Custom endpoint URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Word bounds used by the chunker.
///
/// Rewrite chunking and display chunking are independent values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(rename = "rewriteMaxWords", default = "default_rewrite_max_words")]
    pub rewrite_max_words: usize,

    #[serde(rename = "displayMaxWords", default = "default_display_max_words")]
    pub display_max_words: usize,
}

fn default_rewrite_max_words() -> usize {
    DEFAULT_REWRITE_MAX_WORDS
}

fn default_display_max_words() -> usize {
    DEFAULT_DISPLAY_MAX_WORDS
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            rewrite_max_words: DEFAULT_REWRITE_MAX_WORDS,
            display_max_words: DEFAULT_DISPLAY_MAX_WORDS,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    chunking: Option<ChunkingConfig>,
    prompt: Option<PromptConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PromptConfig {
    id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            chunking: ChunkingConfig::default(),
            prompt_id: DEFAULT_PROMPT_ID.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `REDRAFT_WORKSPACE`: Override workspace path
    /// - `REDRAFT_CONFIG`: Path to config file
    /// - `REDRAFT_PROVIDER`: Rewrite provider
    /// - `REDRAFT_MODEL`: Model identifier
    /// - `REDRAFT_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use redraft_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("REDRAFT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("REDRAFT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.redraft_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("REDRAFT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("REDRAFT_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("REDRAFT_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self;

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(chunking) = config_file.chunking {
            result.chunking = chunking;
        }

        if let Some(id) = config_file.prompt.and_then(|p| p.id) {
            result.prompt_id = id;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(settings) = llm.providers.get(&llm.active_provider) {
                result.model = settings.model.clone();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            // A provider switch picks up that provider's configured model
            // unless a model is given explicitly as well.
            if let Some(settings) = self.provider_settings(&provider) {
                self.model = settings.model.clone();
            }
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .redraft directory.
    pub fn redraft_dir(&self) -> PathBuf {
        self.workspace.join(".redraft")
    }

    /// Get the configured settings for a provider, if any.
    pub fn provider_settings(&self, provider: &str) -> Option<&ProviderSettings> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Get the configured endpoint for a provider, if any.
    pub fn provider_endpoint(&self, provider: &str) -> Option<&str> {
        self.provider_settings(provider)
            .and_then(|settings| settings.endpoint.as_deref())
    }

    /// Resolve the API key for a provider.
    ///
    /// An explicit `REDRAFT_API_KEY` wins over the provider's `apiKeyEnv`.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = self
            .provider_settings(provider)
            .and_then(|settings| settings.api_key_env.clone())
            .or_else(|| default_api_key_env(provider).map(str::to_string))?;

        std::env::var(env_var).ok()
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.chunking.rewrite_max_words == 0 || self.chunking.display_max_words == 0 {
            return Err(AppError::Config(
                "Chunk sizes must be greater than zero".to_string(),
            ));
        }

        if default_api_key_env(&provider).is_some() && self.resolve_api_key(&provider).is_none() {
            let env_var = self
                .provider_settings(&self.provider)
                .and_then(|settings| settings.api_key_env.clone())
                .or_else(|| default_api_key_env(&provider).map(str::to_string))
                .unwrap_or_default();
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        Ok(())
    }
}

/// Conventional API key variable for hosted providers.
fn default_api_key_env(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("OPENAI_API_KEY"),
        "claude" | "anthropic" => Some("ANTHROPIC_API_KEY"),
        _ => None,
    }
}
