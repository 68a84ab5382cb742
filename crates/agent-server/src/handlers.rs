//! HTTP Handlers

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use agent_core::{AgentError, AgentProfile, Message, ToolsMode, TurnOutcome};
use agent_knowledge::{IndexStatus, IngestReport, KB_SEARCH, KnowledgeError, Upload};

use crate::profiles::{AgentPatch, NewAgent, ProfileError};
use crate::state::AppState;
use crate::templates::{TEMPLATES, TemplatesResponse};

/// Multipart field that carries uploaded documents
pub const UPLOAD_FIELD: &str = "files";

/// Name given to a file part that arrives without one
pub const UNNAMED_FILE: &str = "unnamed_file";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tools: Vec<String>,
    pub chat_backend: String,
    pub embedding_backend: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(alias = "gem_id")]
    pub agent_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools_mode: ToolsMode,
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    Profiles(#[from] ProfileError),
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(format!("invalid upload: {}", err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error) = match &self {
            Self::AgentNotFound(_) => (StatusCode::NOT_FOUND, "AGENT_NOT_FOUND", self.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            Self::Agent(e @ (AgentError::Provider { .. } | AgentError::ProviderUnavailable { .. })) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", e.user_message())
            }
            Self::Agent(e) => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", e.user_message()),
            Self::Knowledge(KnowledgeError::InvalidCorpusId(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_AGENT_ID", self.to_string())
            }
            Self::Knowledge(KnowledgeError::Embedding(e)) => {
                (StatusCode::BAD_GATEWAY, "EMBEDDING_ERROR", e.user_message())
            }
            Self::Knowledge(e) => (StatusCode::INTERNAL_SERVER_ERROR, "INGEST_ERROR", e.to_string()),
            Self::Profiles(e) => (StatusCode::INTERNAL_SERVER_ERROR, "PROFILE_STORE_ERROR", e.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error,
                code: code.into(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn require_agent(state: &AppState, id: &str) -> ApiResult<AgentProfile> {
    state
        .profiles
        .get(id)
        .await?
        .ok_or_else(|| ApiError::AgentNotFound(id.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tools: state.orchestrator.tools().names(),
        chat_backend: state.chat_backend.clone(),
        embedding_backend: state.embedding_backend.clone(),
    })
}

pub async fn list_templates() -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        templates: TEMPLATES,
    })
}

pub async fn list_agents(State(state): State<AppState>) -> ApiResult<Json<Vec<AgentProfile>>> {
    Ok(Json(state.profiles.list().await?))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentProfile>> {
    Ok(Json(require_agent(&state, &id).await?))
}

pub async fn create_agent(
    State(state): State<AppState>,
    Json(body): Json<NewAgent>,
) -> ApiResult<(StatusCode, Json<AgentProfile>)> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("agent name must not be empty".into()));
    }
    let profile = state.profiles.create(body).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<AgentPatch>,
) -> ApiResult<Json<AgentProfile>> {
    state
        .profiles
        .update(&id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::AgentNotFound(id))
}

pub async fn delete_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    if state.profiles.delete(&id).await? {
        Ok(Json(DeletedResponse { deleted: true }))
    } else {
        Err(ApiError::AgentNotFound(id))
    }
}

/// Multipart upload: every file part is ingested, replacing the agent's corpus
pub async fn upload_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<IngestReport>> {
    let agent = require_agent(&state, &id).await?;

    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let file_name = match field.file_name() {
            Some(name) => name.to_string(),
            None if field.name() == Some(UPLOAD_FIELD) => UNNAMED_FILE.to_string(),
            None => continue,
        };
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            tracing::debug!(agent = %id, file = %file_name, "skipping empty upload");
            continue;
        }
        uploads.push(Upload::new(file_name, bytes.to_vec()));
    }

    if uploads.is_empty() {
        return Err(ApiError::BadRequest("no non-empty files in upload".into()));
    }

    let report = state.ingestor.ingest(&agent.id, uploads).await?;

    if !agent.declares_tool(KB_SEARCH) {
        state.profiles.add_tool(&agent.id, KB_SEARCH).await?;
    }

    Ok(Json(report))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FilesResponse>> {
    require_agent(&state, &id).await?;
    Ok(Json(FilesResponse {
        files: state.index.list_files(&id).await,
    }))
}

pub async fn kb_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<IndexStatus>> {
    require_agent(&state, &id).await?;
    Ok(Json(state.index.status(&id).await))
}

/// One conversation turn
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> ApiResult<Json<TurnOutcome>> {
    let agent = require_agent(&state, &payload.agent_id).await?;

    let outcome = state
        .orchestrator
        .run_turn(&agent, &payload.messages, payload.tools_mode)
        .await?;

    tracing::info!(
        agent = %agent.id,
        used_tool = outcome.used_tool.as_deref().unwrap_or("-"),
        "turn complete"
    );
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use agent_core::{ChatOptions, ChatProvider, EmbeddingProvider, Result as AgentResult};
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::router;
    use crate::state::AppState;

    /// Replies from a script, recording every conversation it was sent
    struct ScriptedChat {
        replies: Mutex<Vec<String>>,
        seen: Mutex<Vec<Vec<agent_core::Message>>>,
    }

    impl ScriptedChat {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| (*s).to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedChat {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "script-1"
        }

        async fn chat(
            &self,
            messages: &[agent_core::Message],
            _options: &ChatOptions,
        ) -> AgentResult<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| agent_core::AgentError::unavailable("scripted", "script exhausted"))
        }
    }

    /// One dimension per letter a..z
    struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        fn name(&self) -> &str {
            "letters"
        }

        async fn embed(&self, texts: &[String]) -> AgentResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0_f32; 26];
                    for b in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                        v[usize::from(b - b'a')] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    async fn app(dir: &std::path::Path, chat: Arc<ScriptedChat>) -> (Router, AppState) {
        let state = AppState::assemble(chat, Arc::new(LetterEmbedder), Vec::new(), dir)
            .await
            .unwrap();
        (router(state.clone()), state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (u16, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// One multipart part: form field name, optional file name, content
    type Part<'a> = (&'a str, Option<&'a str>, &'a str);

    fn multipart_parts(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        let boundary = "gems-test-boundary";
        let mut body = String::new();
        for (field, file_name, content) in parts {
            let file_name = file_name.map_or_else(String::new, |n| format!("; filename=\"{n}\""));
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"{file_name}\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn multipart(uri: &str, files: &[(&str, &str)]) -> Request<Body> {
        let parts: Vec<Part<'_>> = files
            .iter()
            .map(|(name, content)| ("files", Some(*name), *content))
            .collect();
        multipart_parts(uri, &parts)
    }

    async fn agent_named(state: &AppState, name: &str) -> agent_core::AgentProfile {
        state
            .profiles
            .list()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap()
    }

    #[tokio::test]
    async fn health_lists_tools_and_backends() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path(), Arc::new(ScriptedChat::new(&[]))).await;

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["tools"], json!(["calculator", "kb_search"]));
        assert_eq!(body["chat_backend"], "scripted");
        assert_eq!(body["embedding_backend"], "letters");
    }

    #[tokio::test]
    async fn chat_runs_calculator_turn() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(ScriptedChat::new(&[
            r#"{"tool":"calculator","input":"12*7"}"#,
            "12 times 7 is 84.",
        ]));
        let (app, state) = app(dir.path(), chat.clone()).await;
        let travel = agent_named(&state, "Travel").await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/chat",
                &json!({
                    "agent_id": travel.id,
                    "messages": [{"role": "user", "content": "what is 12*7?"}]
                }),
            ),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["content"], "12 times 7 is 84.");
        assert_eq!(body["used_tool"], "calculator");
        assert_eq!(body["tool_input"], "12*7");

        let seen = chat.seen.lock().unwrap();
        let tool_message = &seen[1].last().unwrap().content;
        assert_eq!(tool_message, "Tool calculator result:\n12*7 = 84");
    }

    #[tokio::test]
    async fn chat_with_unknown_agent_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path(), Arc::new(ScriptedChat::new(&[]))).await;
        let (status, body) = send(
            &app,
            post_json("/api/chat", &json!({"agent_id": "nope", "messages": []})),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body["code"], "AGENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn chat_provider_failure_is_single_502() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app(dir.path(), Arc::new(ScriptedChat::new(&[]))).await;
        let tutor = agent_named(&state, "English Tutor").await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/chat",
                &json!({
                    "gem_id": tutor.id,
                    "messages": [{"role": "user", "content": "hi"}],
                    "tools_mode": "off"
                }),
            ),
        )
        .await;
        assert_eq!(status, 502);
        assert_eq!(body["code"], "PROVIDER_ERROR");
    }

    #[tokio::test]
    async fn upload_indexes_and_declares_kb_search() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(ScriptedChat::new(&["Paris, per [1]."]));
        let (app, state) = app(dir.path(), chat.clone()).await;
        let tutor = agent_named(&state, "English Tutor").await;
        assert!(!tutor.declares_tool("kb_search"));

        let uri = format!("/api/agents/{}/files", tutor.id);
        let (status, body) = send(
            &app,
            multipart(
                &uri,
                &[("capitals.txt", "The capital of France is Paris."), ("empty.txt", "")],
            ),
        )
        .await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["files"], json!(["capitals.txt"]));
        assert_eq!(body["chunks"], 1);

        let (_, agent) = send(&app, get(&format!("/api/agents/{}", tutor.id))).await;
        assert_eq!(agent["tools"], json!(["kb_search"]));

        let (_, files) = send(&app, get(&uri)).await;
        assert_eq!(files["files"], json!(["capitals.txt"]));

        let (_, kb) = send(&app, get(&format!("/api/agents/{}/kb/status", tutor.id))).await;
        assert_eq!(kb, json!({"indexed": true, "chunks": 1, "files": ["capitals.txt"]}));

        // grounding lands after history as a system message
        let (status, _) = send(
            &app,
            post_json(
                "/api/chat",
                &json!({
                    "agent_id": tutor.id,
                    "messages": [{"role": "user", "content": "capital of France?"}],
                    "tools_mode": "off"
                }),
            ),
        )
        .await;
        assert_eq!(status, 200);
        let seen = chat.seen.lock().unwrap();
        let grounding = seen[0].last().unwrap();
        assert_eq!(grounding.role, agent_core::Role::System);
        assert!(grounding.content.contains("[1] (src: capitals.txt, score="));
    }

    #[tokio::test]
    async fn upload_without_files_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app(dir.path(), Arc::new(ScriptedChat::new(&[]))).await;
        let tutor = agent_named(&state, "English Tutor").await;

        let (status, _) = send(
            &app,
            multipart(&format!("/api/agents/{}/files", tutor.id), &[("empty.txt", "")]),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn agent_crud_round() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path(), Arc::new(ScriptedChat::new(&[]))).await;

        let (status, created) = send(
            &app,
            post_json(
                "/api/agents",
                &json!({"name": "Math", "system_prompt": "Use the calculator.", "tools": ["calculator"]}),
            ),
        )
        .await;
        assert_eq!(status, 201);
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["instructions"], "Use the calculator.");

        let update = Request::put(format!("/api/agents/{id}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"temperature": 0.5}).to_string()))
            .unwrap();
        let (status, updated) = send(&app, update).await;
        assert_eq!(status, 200);
        assert_eq!(updated["temperature"], 0.5);

        let delete = Request::delete(format!("/api/agents/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, delete).await;
        assert_eq!(status, 200);

        let (status, _) = send(&app, get(&format!("/api/agents/{id}"))).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn file_part_without_name_is_ingested_as_unnamed() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app(dir.path(), Arc::new(ScriptedChat::new(&[]))).await;
        let tutor = agent_named(&state, "English Tutor").await;

        let (status, body) = send(
            &app,
            multipart_parts(
                &format!("/api/agents/{}/files", tutor.id),
                &[
                    ("files", None, "Paris is the capital of France."),
                    ("note", None, "not a document"),
                ],
            ),
        )
        .await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["files"], json!(["unnamed_file"]));
        assert_eq!(body["chunks"], 1);
    }

    #[tokio::test]
    async fn kb_status_requires_a_known_agent() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app(dir.path(), Arc::new(ScriptedChat::new(&[]))).await;

        let (status, body) = send(&app, get("/api/agents/no-such-agent/kb/status")).await;
        assert_eq!(status, 404);
        assert_eq!(body["code"], "AGENT_NOT_FOUND");
        assert!(!dir.path().join("no-such-agent").exists());

        let tutor = agent_named(&state, "English Tutor").await;
        let (status, body) = send(&app, get(&format!("/api/agents/{}/kb/status", tutor.id))).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"indexed": false, "chunks": 0, "files": []}));
    }

    #[tokio::test]
    async fn templates_can_be_posted_as_agents() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path(), Arc::new(ScriptedChat::new(&[]))).await;

        let (status, body) = send(&app, get("/api/templates")).await;
        assert_eq!(status, 200);
        let templates = body["templates"].as_array().unwrap();
        assert_eq!(templates.len(), 6);

        let support = templates
            .iter()
            .find(|t| t["id"] == "customer_support")
            .unwrap();
        assert_eq!(support["tools"], json!(["kb_search"]));

        let (status, created) = send(&app, post_json("/api/agents", support)).await;
        assert_eq!(status, 201);
        assert_eq!(created["name"], "Customer Support Agent");
        assert_eq!(created["tools"], json!(["kb_search"]));
        assert_eq!(created["instructions"], support["instructions"]);
        assert_ne!(created["id"], "customer_support");
    }
}
