//! Command handlers for the Redraft CLI.

pub mod chunks;
pub mod prompts;
pub mod rewrite;

// Re-export command types for convenience
pub use chunks::ChunksCommand;
pub use prompts::PromptsCommand;
pub use rewrite::RewriteCommand;

use redraft_core::{AppError, AppResult};
use redraft_rewrite::Document;
use std::path::Path;

/// Read a UTF-8 text file into a document titled by its file name.
pub(crate) fn read_document(path: &Path) -> AppResult<Document> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::Input(format!("Failed to read {:?}: {}", path, e))
    })?;

    let title = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document");

    tracing::debug!("Read {} bytes from {:?}", text.len(), path);
    Ok(Document::new(title, text))
}

/// First `max_chars` characters of `text` on one line.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}
