//! gems-agent HTTP Server
//!
//! Axum-based server exposing agent profiles, per-agent document uploads,
//! knowledge-base status and chat turns.

mod handlers;
mod profiles;
mod state;
mod templates;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_runtime::RuntimeConfig;

use crate::handlers::{
    chat_handler, create_agent, delete_agent, get_agent, health_check, kb_status, list_agents,
    list_files, list_templates, update_agent, upload_files,
};
use crate::state::{AppState, ServerConfig};

/// Upper bound on a multipart upload body
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = RuntimeConfig::from_env()?;
    let server = ServerConfig::from_env();

    let state = AppState::from_config(&runtime, &server).await?;

    tracing::info!(
        chat = %state.chat_backend,
        embeddings = %state.embedding_backend,
        data_dir = %server.data_dir.display(),
        "backends ready"
    );
    let tools = state.orchestrator.tools().names();
    tracing::info!("Registered {} tools: {}", tools.len(), tools.join(", "));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;

    tracing::info!("gems-agent server running on http://{}", server.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                     - Health check");
    tracing::info!("  GET    /api/templates              - Starter agent templates");
    tracing::info!("  GET    /api/agents                 - List agents");
    tracing::info!("  POST   /api/agents                 - Create agent");
    tracing::info!("  GET    /api/agents/{{id}}            - Get agent");
    tracing::info!("  PUT    /api/agents/{{id}}            - Update agent");
    tracing::info!("  DELETE /api/agents/{{id}}            - Delete agent");
    tracing::info!("  POST   /api/agents/{{id}}/files      - Upload documents");
    tracing::info!("  GET    /api/agents/{{id}}/files      - List documents");
    tracing::info!("  GET    /api/agents/{{id}}/kb/status  - Knowledge base status");
    tracing::info!("  POST   /api/chat                   - Run a chat turn");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router around `state`
pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/templates", get(list_templates))
        // Agents
        .route("/api/agents", get(list_agents).post(create_agent))
        .route(
            "/api/agents/{id}",
            get(get_agent).put(update_agent).delete(delete_agent),
        )
        // Knowledge base
        .route("/api/agents/{id}/files", get(list_files).post(upload_files))
        .route("/api/agents/{id}/kb/status", get(kb_status))
        // Turns
        .route("/api/chat", post(chat_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
