//! Rewrite command handler.
//!
//! Chunks a document, selects chunks, runs one orchestration and prints the
//! consolidated (or merged) result. Ctrl-C cancels at the next chunk boundary.

use super::read_document;
use clap::Args;
use redraft_core::{config::AppConfig, AppError, AppResult};
use redraft_rewrite::{
    ChunkerConfig, Document, EditingSession, LlmRewriteService, Orchestrator, RunEvent,
    RunOutcome, RunReporter, RunRequest,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Rewrite selected chunks of a document under one instruction
#[derive(Args, Debug)]
pub struct RewriteCommand {
    /// Text file to rewrite
    pub file: PathBuf,

    /// Instruction applied to every selected chunk
    #[arg(short, long)]
    pub instruction: String,

    /// Chunks to rewrite, e.g. "1,3,5-7"
    #[arg(short, long, conflicts_with = "all")]
    pub select: Option<String>,

    /// Rewrite every chunk
    #[arg(long)]
    pub all: bool,

    /// Words per chunk (default: configured rewrite chunk size)
    #[arg(long)]
    pub max_words: Option<usize>,

    /// Print the whole document with rewritten chunks spliced in
    #[arg(long)]
    pub merge: bool,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RewriteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing rewrite command");
        tracing::debug!("Rewrite command options: {:?}", self);

        config.validate()?;

        // 1. Load and chunk the document
        let document = read_document(&self.file)?;
        let session = self.load_session(document, config)?;

        // 2. Apply the selection
        {
            let mut store = session.store().write().await;
            if self.all {
                store.select_all();
            } else if let Some(ref selection) = self.select {
                let indices = parse_selection(selection, store.len())?;
                store.select_indices(&indices)?;
            } else {
                return Err(AppError::Input(
                    "Nothing selected: pass --select or --all".to_string(),
                ));
            }
        }

        // 3. Build the rewrite service for the configured providers
        let service = LlmRewriteService::from_config(config)?;
        let reporter = RunReporter::new(Arc::new(|event: RunEvent| {
            eprintln!("{}", event.format_simple());
        }));
        let orchestrator = Orchestrator::new(Arc::new(service)).with_reporter(reporter);

        // 4. Cancel at the next chunk boundary on Ctrl-C
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, stopping after the current chunk");
                    cancel.cancel();
                }
            })
        };

        let request = RunRequest::new(self.instruction.clone(), config.provider.clone());
        let result = orchestrator
            .run_selection(session.store(), &request, &cancel)
            .await;
        watcher.abort();
        let report = result?;

        // 5. Reintegrate
        let text = if self.merge {
            session.merged().await?.text().to_string()
        } else {
            session.consolidate().await
        };

        if self.json {
            let output = serde_json::json!({
                "report": report,
                "export": session.export().await,
                "text": text,
            });
            self.write_output(&serde_json::to_string_pretty(&output)?)?;
        } else {
            self.write_output(&text)?;
        }

        match report.outcome {
            RunOutcome::Completed => Ok(()),
            RunOutcome::Aborted { at_index } => Err(AppError::Transform(format!(
                "run aborted at chunk {}: {}",
                at_index,
                report
                    .failure
                    .as_ref()
                    .map(|failure| failure.error.as_str())
                    .unwrap_or("unknown error")
            ))),
            RunOutcome::Cancelled { next_index } => Err(AppError::Other(format!(
                "run cancelled before chunk {}",
                next_index
            ))),
        }
    }

    fn load_session(&self, document: Document, config: &AppConfig) -> AppResult<EditingSession> {
        let mut chunker = ChunkerConfig::from(config.chunking);
        if let Some(max_words) = self.max_words {
            chunker.rewrite_max_words = max_words;
        }
        EditingSession::load(document, chunker)
    }

    fn write_output(&self, text: &str) -> AppResult<()> {
        match self.out {
            Some(ref path) => {
                std::fs::write(path, text)?;
                tracing::info!("Wrote {} bytes to {:?}", text.len(), path);
            }
            None => println!("{}", text),
        }
        Ok(())
    }
}

/// Parse a selection such as `"1,3,5-7"` into sorted, unique chunk indices.
///
/// Every index must fall within `1..=total`.
fn parse_selection(selection: &str, total: usize) -> AppResult<Vec<usize>> {
    let invalid = |part: &str| AppError::Input(format!("Invalid chunk selection: {:?}", part));
    let out_of_range = |part: &str| {
        AppError::Input(format!(
            "Chunk selection {:?} is outside 1-{}",
            part, total
        ))
    };
    let mut indices = Vec::new();

    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: usize = start.trim().parse().map_err(|_| invalid(part))?;
                let end: usize = end.trim().parse().map_err(|_| invalid(part))?;
                if start == 0 || start > end {
                    return Err(invalid(part));
                }
                if end > total {
                    return Err(out_of_range(part));
                }
                indices.extend(start..=end);
            }
            None => {
                let index: usize = part.parse().map_err(|_| invalid(part))?;
                if index == 0 {
                    return Err(invalid(part));
                }
                if index > total {
                    return Err(out_of_range(part));
                }
                indices.push(index);
            }
        }
    }

    indices.sort_unstable();
    indices.dedup();

    if indices.is_empty() {
        return Err(AppError::Input("Empty chunk selection".to_string()));
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1,3,5-7", 10).unwrap(), vec![1, 3, 5, 6, 7]);
        assert_eq!(parse_selection(" 3, 1 ,3 ", 3).unwrap(), vec![1, 3]);
        assert_eq!(parse_selection("2-2", 2).unwrap(), vec![2]);
    }

    #[test]
    fn test_parse_selection_rejects_garbage() {
        for bad in ["", ",", "0", "a", "5-3", "1-x", "0-2"] {
            assert!(parse_selection(bad, 10).unwrap_err().is_input(), "{:?}", bad);
        }
    }

    #[test]
    fn test_parse_selection_checks_bounds_before_expanding() {
        let err = parse_selection("1-99999999999", 10).unwrap_err();
        assert!(err.is_input());
        assert!(err.to_string().contains("outside 1-10"));
        assert!(parse_selection("11", 10).unwrap_err().is_input());
        assert_eq!(parse_selection("8-10", 10).unwrap(), vec![8, 9, 10]);
    }
}
