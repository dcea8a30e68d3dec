//! Prompt system for Redraft.
//!
//! This crate turns one chunk plus one instruction into the text that is sent
//! to a completion provider:
//! - YAML-based prompt definitions (`.redraft/prompts/<id>.yml`)
//! - A built-in default rewrite prompt
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, build_rewrite_prompt};
pub use loader::{default_rewrite_prompt, list_prompts, load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec};
