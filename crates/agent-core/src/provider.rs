//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for chat and embedding backends (Ollama, OpenAI,
//! Gemini, ...) so the orchestrator and the retriever work with any backend
//! without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{ChatOptions, ChatProvider};
//!
//! let reply = provider.chat(conversation.messages(), &ChatOptions::new(0.2)).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// Per-call generation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Model identifier overriding the backend's configured default
    #[serde(default)]
    pub model: Option<String>,
}

const fn default_temperature() -> f32 {
    0.2
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            model: None,
        }
    }
}

impl ChatOptions {
    pub const fn new(temperature: f32) -> Self {
        Self {
            temperature,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.trim().is_empty());
        self
    }

    /// The override if set, else the given default
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }
}

/// Strategy trait for chat backends
///
/// Implementations build their native request shape from the role/content
/// list and normalize the native response into one plain-text reply.
/// Transport failures and non-2xx answers are returned as errors.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Backend name (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    /// Model used when the call carries no override
    fn default_model(&self) -> &str;

    /// Send the conversation and return the single reply text
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> Result<String>;
}

/// Strategy trait for embedding backends
///
/// `embed` returns exactly one vector per input text, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Backend name (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            crate::AgentError::provider(self.name(), "embedding response was empty")
        })
    }
}
