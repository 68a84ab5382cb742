//! Backend selection
//!
//! One tagged variant per backend behind the shared chat/embedding traits,
//! plus the single place where the fallback policy is applied.

use std::sync::Arc;

use agent_core::{ChatOptions, ChatProvider, EmbeddingProvider, Message, Result};
use async_trait::async_trait;

use crate::config::{BackendKind, RuntimeConfig};
use crate::embeddings::SanitizingEmbedder;
use crate::gemini::GeminiProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

/// A configured backend
pub enum Backend {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    Gemini(GeminiProvider),
}

impl Backend {
    /// Build exactly the backend named by `kind`, no fallback
    pub fn build(kind: BackendKind, config: &RuntimeConfig) -> Result<Self> {
        let (http, embed) = (config.http_timeout, config.embed_timeout);
        Ok(match kind {
            BackendKind::Ollama => Self::Ollama(OllamaProvider::new(config.ollama.clone(), http, embed)?),
            BackendKind::OpenAi => Self::OpenAi(OpenAiProvider::new(config.openai.clone(), http, embed)?),
            BackendKind::Gemini => Self::Gemini(GeminiProvider::new(config.gemini.clone(), http, embed)?),
        })
    }

    /// Build the backend the fallback policy picks for `requested`
    pub fn resolve(requested: BackendKind, config: &RuntimeConfig) -> Result<Self> {
        Self::build(config.resolve(requested), config)
    }

    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Ollama(_) => BackendKind::Ollama,
            Self::OpenAi(_) => BackendKind::OpenAi,
            Self::Gemini(_) => BackendKind::Gemini,
        }
    }

    fn chat_impl(&self) -> &dyn ChatProvider {
        match self {
            Self::Ollama(p) => p,
            Self::OpenAi(p) => p,
            Self::Gemini(p) => p,
        }
    }

    fn embed_impl(&self) -> &dyn EmbeddingProvider {
        match self {
            Self::Ollama(p) => p,
            Self::OpenAi(p) => p,
            Self::Gemini(p) => p,
        }
    }
}

#[async_trait]
impl ChatProvider for Backend {
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    fn default_model(&self) -> &str {
        self.chat_impl().default_model()
    }

    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> Result<String> {
        self.chat_impl().chat(messages, options).await
    }
}

#[async_trait]
impl EmbeddingProvider for Backend {
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_impl().embed(texts).await
    }
}

/// Chat provider for the configured chat backend
pub fn chat_provider(config: &RuntimeConfig) -> Result<Arc<dyn ChatProvider>> {
    let backend = Backend::resolve(config.chat_backend, config)?;
    tracing::info!(backend = %backend.kind(), model = backend.default_model(), "chat backend ready");
    Ok(Arc::new(backend))
}

/// Sanitizing embedding provider for the configured embedding backend
pub fn embedding_provider(config: &RuntimeConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let backend = Backend::resolve(config.embed_backend, config)?;
    tracing::info!(backend = %backend.kind(), "embedding backend ready");
    Ok(Arc::new(SanitizingEmbedder::new(backend)))
}
