//! Redraft Core Library
//!
//! This crate provides the foundational utilities shared by every Redraft crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (providers, chunk sizes, prompt selection)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, ChunkingConfig};
pub use error::{AppError, AppResult};
