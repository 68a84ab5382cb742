//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Backend answered, but with a failure status or an unusable body
    #[error("Provider error ({backend}): {message}")]
    Provider { backend: String, message: String },

    /// Backend could not be reached or timed out
    #[error("Provider unavailable ({backend}): {message}")]
    ProviderUnavailable { backend: String, message: String },

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Parse error (e.g., a malformed backend payload)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn provider(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. } | Self::Io(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider { backend, message } => {
                format!("The AI service ({backend}) encountered an error: {message}")
            }
            Self::ProviderUnavailable { backend, .. } => {
                format!("The AI service ({backend}) is currently unavailable. Please try again.")
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::Config(msg) => format!("The agent is misconfigured: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
