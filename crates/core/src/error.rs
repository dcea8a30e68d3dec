//! Error types for Redraft.
//!
//! This module defines a unified error enum. Besides the ambient categories
//! (configuration, I/O, provider transport, prompts, serialization) it carries
//! the three categories the rewrite pipeline distinguishes:
//! input errors, transform errors and consistency errors.

use thiserror::Error;

/// Unified error type for Redraft.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller supplied invalid input (blank instruction, empty selection,
    /// invalid chunk size, unknown provider). Detected before any remote call.
    #[error("Input error: {0}")]
    Input(String),

    /// The rewrite of a single chunk failed.
    #[error("Transform error: {0}")]
    Transform(String),

    /// An internal invariant was violated.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error was caused by invalid caller input.
    pub fn is_input(&self) -> bool {
        matches!(self, AppError::Input(_))
    }

    /// Whether this error signals a broken internal invariant.
    pub fn is_consistency(&self) -> bool {
        matches!(self, AppError::Consistency(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
