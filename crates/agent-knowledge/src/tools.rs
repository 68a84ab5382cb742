use std::sync::Arc;

use agent_core::{AgentError, Result, Tool, ToolContext};
use async_trait::async_trait;

use crate::retriever::{Retriever, build_context};

/// Snippets returned per `kb_search` call
pub const KB_SEARCH_K: usize = 4;

pub const KB_SEARCH: &str = "kb_search";

/// `kb_search`: query the calling agent's own corpus
pub struct KbSearchTool {
    retriever: Arc<Retriever>,
    k: usize,
}

impl KbSearchTool {
    pub const fn new(retriever: Arc<Retriever>) -> Self {
        Self {
            retriever,
            k: KB_SEARCH_K,
        }
    }
}

#[async_trait]
impl Tool for KbSearchTool {
    fn name(&self) -> &str {
        KB_SEARCH
    }

    fn description(&self) -> &str {
        "Search the agent's uploaded documents"
    }

    async fn execute(&self, input: &str, ctx: &ToolContext) -> Result<String> {
        let corpus_id = ctx
            .agent_id
            .as_deref()
            .ok_or_else(|| AgentError::ToolExecution("no agent context for knowledge base search".into()))?;

        let snippets = self.retriever.query(corpus_id, input.trim(), self.k).await?;
        if snippets.is_empty() {
            return Ok("No relevant knowledge base snippets.".into());
        }
        Ok(build_context(&snippets))
    }
}
