//! Chunks command handler.

use super::{preview, read_document};
use clap::Args;
use redraft_core::{config::AppConfig, AppResult};
use redraft_rewrite::chunk_document;
use std::path::PathBuf;

/// Split a document into chunks and list them
#[derive(Args, Debug)]
pub struct ChunksCommand {
    /// Text file to chunk
    pub file: PathBuf,

    /// Words per chunk (default: configured rewrite chunk size)
    #[arg(long)]
    pub max_words: Option<usize>,

    /// Use the display chunk size instead of the rewrite chunk size
    #[arg(long)]
    pub display: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChunksCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chunks command");

        let document = read_document(&self.file)?;
        let max_words = self.max_words.unwrap_or(if self.display {
            config.chunking.display_max_words
        } else {
            config.chunking.rewrite_max_words
        });

        let chunks = chunk_document(&document, max_words)?;

        if self.json {
            let output = serde_json::json!({
                "title": document.title(),
                "words": document.word_count(),
                "maxWords": max_words,
                "chunks": chunks,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "{}: {} words, {} chunks of up to {} words",
                document.title(),
                document.word_count(),
                chunks.len(),
                max_words
            );
            for chunk in &chunks {
                println!(
                    "{:>4}  {:>5} words  {}",
                    chunk.index,
                    chunk.word_count,
                    preview(&chunk.text, 60)
                );
            }
        }

        Ok(())
    }
}
