//! # agent-core
//!
//! Core agent logic with provider-agnostic chat/embedding abstraction, a tool
//! registry, and the per-turn orchestrator.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                          │
//! │  ┌──────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Tool-call   │  │    Tools    │  │   ChatProvider      │  │
//! │  │  detection   │──│   Registry  │──│   (Strategy)        │  │
//! │  └──────────────┘  └─────────────┘  └─────────────────────┘  │
//! │                 ┌─────────────────────┐                      │
//! │                 │ Grounding (corpus)  │                      │
//! │                 └─────────────────────┘                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ChatProvider` and `EmbeddingProvider` traits enable swapping between
//! Ollama, OpenAI, Gemini, or any other backend without changing agent logic.

pub mod error;
pub mod grounding;
pub mod message;
pub mod orchestrator;
pub mod profile;
pub mod provider;
pub mod tool;
pub mod tool_call;

pub use error::{AgentError, Result};
pub use grounding::Grounding;
pub use message::{Conversation, Message, Role};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, TurnOutcome};
pub use profile::{AgentProfile, ToolsMode};
pub use provider::{ChatOptions, ChatProvider, EmbeddingProvider};
pub use tool::{CalculatorTool, Tool, ToolCall, ToolContext, ToolRegistry};
