//! # agent-knowledge
//!
//! Per-agent document corpora.
//!
//! ```text
//! upload ─▶ extractor ─▶ chunking ─▶ EmbeddingProvider ─▶ IndexStore
//!                                                            │
//! query ──────────────▶ Retriever (cosine, top-k) ◀──────────┘
//! ```
//!
//! The [`Retriever`] implements `agent_core::Grounding`, so the orchestrator
//! can inject retrieved snippets without knowing how they are stored.

pub mod chunking;
pub mod error;
pub mod extractor;
pub mod ingest;
mod locks;
pub mod retriever;
pub mod store;
pub mod tools;

pub use chunking::{ChunkConfig, chunk_text};
pub use error::{KnowledgeError, Result};
pub use extractor::extract_text;
pub use ingest::{IngestReport, Ingestor, Upload};
pub use retriever::{Retriever, Snippet, build_context};
pub use store::{Chunk, CorpusIndex, IndexStatus, IndexStore, VectorMatrix};
pub use tools::{KB_SEARCH, KbSearchTool};
