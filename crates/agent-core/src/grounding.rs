//! Grounding seam between the orchestrator and a document corpus.

use async_trait::async_trait;

/// Source of retrieved context for an agent's corpus.
///
/// Implementations swallow their own failures: a broken index yields an empty
/// context, never a failed turn.
#[async_trait]
pub trait Grounding: Send + Sync {
    /// Whether the corpus has a built index
    async fn has_index(&self, corpus_id: &str) -> bool;

    /// Rendered context for `query`, or an empty string when nothing was found
    async fn context(&self, corpus_id: &str, query: &str, k: usize) -> String;
}
