use agent_core::AgentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid corpus id: {0:?}")]
    InvalidCorpusId(String),

    #[error("unusable upload file name: {0:?}")]
    InvalidFileName(String),

    #[error("index for {corpus} is inconsistent: {chunks} chunks, {rows} vectors")]
    Inconsistent {
        corpus: String,
        chunks: usize,
        rows: usize,
    },

    #[error("embedding failed: {0}")]
    Embedding(#[from] AgentError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = KnowledgeError> = std::result::Result<T, E>;

impl From<KnowledgeError> for AgentError {
    fn from(err: KnowledgeError) -> Self {
        match err {
            KnowledgeError::Embedding(inner) => inner,
            KnowledgeError::Io(inner) => Self::Io(inner),
            KnowledgeError::Serialization(inner) => Self::Json(inner),
            other => Self::Other(other.to_string()),
        }
    }
}
