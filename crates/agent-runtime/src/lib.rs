//! # agent-runtime
//!
//! Backend adapters for the `agent-core` provider traits.
//!
//! ## Supported Backends
//!
//! - **Ollama**: local inference, resilient embeddings with model fallbacks
//! - **OpenAI**: chat completions and batch embeddings
//! - **Gemini**: `generateContent` and `batchEmbedContents`
//!
//! Selection goes through [`RuntimeConfig::resolve`]: a backend whose
//! credentials are missing falls back along OpenAI, Gemini, then Ollama.
//!
//! The crate also provides the [`WebSearchTool`].

pub mod config;
pub mod embeddings;
pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;
pub mod router;
pub mod web_search;

#[cfg(test)]
mod test_support;

pub use config::{BackendKind, GeminiConfig, OllamaConfig, OpenAiConfig, RuntimeConfig};
pub use embeddings::{SanitizingEmbedder, sanitize_for_embedding};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use router::{Backend, chat_provider, embedding_provider};
pub use web_search::WebSearchTool;
