//! Chunked document rewriting for Redraft.
//!
//! This crate holds the rewrite pipeline:
//!
//! ```text
//! Document -> Chunker -> ChunkStore -> selection -> Orchestrator -> Reintegrator
//! ```
//!
//! - [`chunker`]: deterministic word-count chunking
//! - [`store`]: the authoritative chunk store and selection tracker
//! - [`service`]: the rewrite service seam and its LLM-backed implementation
//! - [`orchestrator`]: sequential, abort-on-first-failure rewrite runs
//! - [`reintegrate`]: consolidation and span merging
//! - [`session`]: one document and its chunks for an editing session
//!
//! # Example
//! ```
//! use redraft_rewrite::{
//!     consolidate, shared, ChunkStore, Document, MockRewriteService, Orchestrator, RunRequest,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = Document::new("notes", "w1 w2 w3 w4 w5");
//! let store = shared(ChunkStore::new(&document, 2)?);
//! store.write().await.select_indices(&[1, 3])?;
//!
//! let orchestrator = Orchestrator::new(Arc::new(MockRewriteService::uppercase()));
//! let request = RunRequest::new("uppercase", "mock");
//! orchestrator
//!     .run_selection(&store, &request, &CancellationToken::new())
//!     .await?;
//!
//! assert_eq!(consolidate(&*store.read().await), "W1 W2\n\nW5");
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod document;
pub mod mock;
pub mod orchestrator;
pub mod progress;
pub mod reintegrate;
pub mod service;
pub mod session;
pub mod store;
pub mod types;

// Re-export main types
pub use chunker::{chunk_document, chunk_text, display_chunks, ChunkerConfig};
pub use document::Document;
pub use mock::MockRewriteService;
pub use orchestrator::{ChunkFailure, Orchestrator, RunReport, RunRequest};
pub use progress::{RunCallback, RunEvent, RunReporter};
pub use reintegrate::{
    consolidate, export, merge_all, merge_into_document, ConsolidatedExport, MergedDocument,
    MergedSpan, PARAGRAPH_SEPARATOR,
};
pub use service::{LlmRewriteService, RewriteRequest, RewriteResponse, RewriteService};
pub use session::EditingSession;
pub use store::{shared, ChunkStore, SharedChunkStore, StoreSummary};
pub use types::{Chunk, ChunkStatus, RunOutcome};
