//! Embedding input hygiene
//!
//! Backends reject control characters and very long inputs in different ways;
//! every text is normalized here before it reaches any of them.

use agent_core::{AgentError, EmbeddingProvider, Result};
use async_trait::async_trait;

/// Longest input (in characters) passed to an embedding backend
pub const MAX_EMBED_CHARS: usize = 8000;

/// Stand-in for inputs that normalize to nothing
pub const EMPTY_PLACEHOLDER: &str = ".";

/// Replace control characters (except tab, newline, carriage return) with
/// spaces, collapse whitespace runs, trim, and cap the length.
pub fn sanitize_for_embedding(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r') {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_EMBED_CHARS).collect();
    let capped = capped.trim_end();

    if capped.is_empty() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        capped.to_string()
    }
}

/// Wraps any embedder so every input is sanitized and the output count is
/// checked against the input count.
pub struct SanitizingEmbedder<E> {
    inner: E,
}

impl<E> SanitizingEmbedder<E> {
    pub const fn new(inner: E) -> Self {
        Self { inner }
    }

    pub const fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for SanitizingEmbedder<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let cleaned: Vec<String> = texts.iter().map(|t| sanitize_for_embedding(t)).collect();
        let vectors = self.inner.embed(&cleaned).await?;

        if vectors.len() != texts.len() {
            return Err(AgentError::provider(
                self.inner.name(),
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                ),
            ));
        }
        Ok(vectors)
    }
}
