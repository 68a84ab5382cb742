//! Application State

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_core::{
    CalculatorTool, ChatProvider, EmbeddingProvider, Orchestrator, OrchestratorBuilder, Tool,
    ToolRegistry,
};
use agent_knowledge::{IndexStore, Ingestor, KbSearchTool, Retriever};
use agent_runtime::{RuntimeConfig, WebSearchTool};

use crate::profiles::ProfileStore;

pub const PROFILES_FILE: &str = "agents.json";

/// Server-only settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            data_dir: get("DATA_DIR").map_or_else(|| PathBuf::from("./data"), PathBuf::from),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".into()),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Turn runner with the tool registry and corpus grounding
    pub orchestrator: Arc<Orchestrator>,

    pub profiles: Arc<ProfileStore>,

    pub ingestor: Arc<Ingestor>,

    /// Corpus index, for status and file listings
    pub index: Arc<IndexStore>,

    pub chat_backend: String,
    pub embedding_backend: String,
}

impl AppState {
    /// Wire real backends from the runtime configuration
    pub async fn from_config(runtime: &RuntimeConfig, server: &ServerConfig) -> anyhow::Result<Self> {
        let chat = agent_runtime::chat_provider(runtime)?;
        let embedder = agent_runtime::embedding_provider(runtime)?;
        let web_search: Arc<dyn Tool> = Arc::new(WebSearchTool::new(runtime.http_timeout)?);
        Self::assemble(chat, embedder, vec![web_search], &server.data_dir).await
    }

    /// Wire the state around the given providers. Calculator and `kb_search`
    /// are always registered; `extra_tools` are added on top.
    pub async fn assemble(
        chat: Arc<dyn ChatProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        extra_tools: Vec<Arc<dyn Tool>>,
        data_dir: &Path,
    ) -> anyhow::Result<Self> {
        let index = Arc::new(IndexStore::new(data_dir));
        let retriever = Arc::new(Retriever::new(index.clone(), embedder.clone()));

        let mut tools = ToolRegistry::new();
        tools.register(CalculatorTool);
        tools.register(KbSearchTool::new(retriever.clone()));
        for tool in extra_tools {
            tools.register_arc(tool);
        }

        let chat_backend = chat.name().to_string();
        let embedding_backend = embedder.name().to_string();

        let orchestrator = OrchestratorBuilder::new()
            .chat(chat)
            .tools(tools)
            .grounding(retriever)
            .build()?;

        let profiles = ProfileStore::open(data_dir.join(PROFILES_FILE)).await?;

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            profiles: Arc::new(profiles),
            ingestor: Arc::new(Ingestor::new(index.clone(), embedder)),
            index,
            chat_backend,
            embedding_backend,
        })
    }
}
