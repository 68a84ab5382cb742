//! Similarity search over a corpus index and grounding-context rendering.

use std::sync::Arc;

use agent_core::{EmbeddingProvider, Grounding};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::IndexStore;

/// Guards the denominator against a zero query vector
const EPSILON: f64 = 1e-8;

pub const CONTEXT_HEADER: &str = "Knowledge Base snippets (use if relevant; cite [#]):\n\n";

/// One ranked match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    pub source: String,
    /// Raw cosine similarity
    pub score: f64,
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt()
}

/// `(row · q) / (‖row‖·‖q‖ + ε)` for every row
pub fn cosine_scores(rows: &[Vec<f32>], query: &[f32]) -> Vec<f64> {
    let query_norm = norm(query);
    rows.iter()
        .map(|row| {
            let dot: f64 = row
                .iter()
                .zip(query)
                .map(|(a, b)| f64::from(*a) * f64::from(*b))
                .sum();
            dot / (norm(row) * query_norm + EPSILON)
        })
        .collect()
}

/// Row indices by descending score; equal scores keep chunk order
pub fn rank(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order.truncate(k);
    order
}

/// Render snippets as a numbered grounding block; empty input renders empty.
pub fn build_context(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return String::new();
    }
    let rows: Vec<String> = snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] (src: {}, score={:.3})\n{}", i + 1, s.source, s.score, s.text))
        .collect();
    format!("{CONTEXT_HEADER}{}", rows.join("\n\n"))
}

pub struct Retriever {
    store: Arc<IndexStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(store: Arc<IndexStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Up to `k` best-matching chunks, best first. Empty when the corpus has no
    /// index or no rows.
    pub async fn query(&self, corpus_id: &str, query: &str, k: usize) -> Result<Vec<Snippet>> {
        let Some(index) = self.store.read(corpus_id).await? else {
            return Ok(Vec::new());
        };
        if index.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;
        if query_vector.len() != index.vectors.dim {
            tracing::warn!(
                corpus = corpus_id,
                stored = index.vectors.dim,
                query = query_vector.len(),
                "embedding dimension differs from the stored index"
            );
        }

        let scores = cosine_scores(&index.vectors.rows, &query_vector);
        let snippets = rank(&scores, k)
            .into_iter()
            .map(|i| Snippet {
                text: index.chunks[i].text.clone(),
                source: index.chunks[i].source.clone(),
                score: scores[i],
            })
            .collect::<Vec<_>>();

        tracing::debug!(corpus = corpus_id, hits = snippets.len(), "retrieval done");
        Ok(snippets)
    }
}

#[async_trait]
impl Grounding for Retriever {
    async fn has_index(&self, corpus_id: &str) -> bool {
        self.store.has_index(corpus_id).await
    }

    async fn context(&self, corpus_id: &str, query: &str, k: usize) -> String {
        match self.query(corpus_id, query, k).await {
            Ok(snippets) => build_context(&snippets),
            Err(e) => {
                tracing::warn!(corpus = corpus_id, error = %e, "retrieval failed, answering without grounding");
                String::new()
            }
        }
    }
}
