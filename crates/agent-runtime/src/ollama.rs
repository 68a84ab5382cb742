//! Ollama Provider
//!
//! Chat and embeddings against a local Ollama runtime over its HTTP API.
//!
//! Embedding requests are resilient: Ollama releases disagree on the request
//! field (`prompt` vs `input`) and on the response shape, and some models are
//! not pulled on every host. Each text is tried against the primary model and
//! then each fallback model, with both field names, before giving up with a
//! zero vector.

use agent_core::{AgentError, ChatOptions, ChatProvider, EmbeddingProvider, Message, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::OllamaConfig;
use crate::http::{build_client, join_url, send_json};

const BACKEND: &str = "ollama";

/// Dimension of the vector returned when no model produced an embedding
pub const ZERO_VECTOR_DIM: usize = 768;

/// Request field names, in the order they are tried
const PROMPT_FIELDS: [&str; 2] = ["prompt", "input"];

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ChatRequestOptions,
}

#[derive(Serialize)]
struct ChatRequestOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// Ollama chat/embedding provider
pub struct OllamaProvider {
    chat_client: Client,
    embed_client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn new(
        config: OllamaConfig,
        http_timeout: std::time::Duration,
        embed_timeout: std::time::Duration,
    ) -> Result<Self> {
        Ok(Self {
            chat_client: build_client(BACKEND, http_timeout)?,
            embed_client: build_client(BACKEND, embed_timeout)?,
            config,
        })
    }

    /// Primary model followed by the fallbacks, without repeats
    fn embed_models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = Vec::with_capacity(1 + self.config.embed_fallbacks.len());
        for model in std::iter::once(&self.config.embed_model).chain(&self.config.embed_fallbacks) {
            if !models.contains(&model.as_str()) {
                models.push(model);
            }
        }
        models
    }

    async fn try_embed(&self, model: &str, field: &str, text: &str) -> Result<Vec<f32>> {
        let mut body = Map::new();
        body.insert("model".into(), Value::from(model));
        body.insert(field.into(), Value::from(text));

        let url = join_url(&self.config.base_url, "/api/embeddings");
        let payload: Value = send_json(BACKEND, self.embed_client.post(url).json(&body)).await?;

        parse_embedding(&payload)
            .ok_or_else(|| AgentError::provider(BACKEND, format!("no embedding from model {model}")))
    }

    async fn embed_text(&self, text: &str) -> Vec<f32> {
        for model in self.embed_models() {
            for field in PROMPT_FIELDS {
                match self.try_embed(model, field, text).await {
                    Ok(vector) => return vector,
                    Err(e) => {
                        tracing::debug!(model, field, error = %e, "ollama embedding attempt failed");
                    }
                }
            }
        }
        tracing::warn!(
            models = ?self.embed_models(),
            "no ollama embedding model answered, using zero vector"
        );
        vec![0.0; ZERO_VECTOR_DIM]
    }
}

/// Pull a non-empty embedding out of any of the response shapes Ollama uses
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn parse_embedding(payload: &Value) -> Option<Vec<f32>> {
    let candidates = [
        payload.get("embedding"),
        payload.pointer("/data/0/embedding"),
        payload.pointer("/embeddings/0"),
    ];

    candidates.into_iter().flatten().find_map(|value| {
        let numbers = value.as_array()?;
        if numbers.is_empty() {
            return None;
        }
        numbers
            .iter()
            .map(|n| n.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
    })
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn name(&self) -> &str {
        BACKEND
    }

    fn default_model(&self) -> &str {
        &self.config.chat_model
    }

    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> Result<String> {
        let model = options.model_or(&self.config.chat_model);
        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options: ChatRequestOptions {
                temperature: options.temperature,
            },
        };

        tracing::debug!(model, messages = messages.len(), "ollama chat");

        let url = join_url(&self.config.base_url, "/api/chat");
        let response: ChatResponse =
            send_json(BACKEND, self.chat_client.post(url).json(&request)).await?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_text(text).await);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_backend;
    use agent_core::Role;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn prompt_of(body: &Value) -> Option<&str> {
        PROMPT_FIELDS
            .iter()
            .find_map(|field| body.get(*field).and_then(Value::as_str))
    }

    fn provider(base_url: String, fallbacks: &[&str]) -> OllamaProvider {
        let config = OllamaConfig {
            base_url,
            chat_model: "llama3.1:8b".into(),
            embed_model: "nomic-embed-text".into(),
            embed_fallbacks: fallbacks.iter().map(|s| (*s).to_string()).collect(),
        };
        OllamaProvider::new(config, Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn parse_embedding_accepts_all_shapes() {
        assert_eq!(
            parse_embedding(&json!({"embedding": [0.5, 1.0]})),
            Some(vec![0.5, 1.0])
        );
        assert_eq!(
            parse_embedding(&json!({"data": [{"embedding": [2.0]}]})),
            Some(vec![2.0])
        );
        assert_eq!(
            parse_embedding(&json!({"embeddings": [[3.0, 4.0]]})),
            Some(vec![3.0, 4.0])
        );
        assert_eq!(parse_embedding(&json!({"embedding": []})), None);
        assert_eq!(parse_embedding(&json!({"error": "model not found"})), None);
    }

    #[test]
    fn embed_models_are_deduplicated() {
        let p = provider(
            "http://127.0.0.1:1".into(),
            &["mxbai-embed-large", "nomic-embed-text"],
        );
        assert_eq!(p.embed_models(), vec!["nomic-embed-text", "mxbai-embed-large"]);
    }

    #[tokio::test]
    async fn chat_sends_model_temperature_and_reads_content() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let seen_in = seen.clone();
        let app = Router::new().route(
            "/api/chat",
            post(move |Json(body): Json<Value>| {
                let seen = seen_in.clone();
                async move {
                    *seen.lock().unwrap() = body;
                    Json(json!({"message": {"role": "assistant", "content": "hi there"}}))
                }
            }),
        );
        let p = provider(spawn_backend(app).await, &[]);

        let messages = vec![Message::system("be brief"), Message::user("hello")];
        let options = ChatOptions::new(0.7).with_model(Some("qwen2.5".into()));
        let reply = p.chat(&messages, &options).await.unwrap();
        assert_eq!(reply, "hi there");

        let body = seen.lock().unwrap().clone();
        assert_eq!(body["model"], "qwen2.5");
        assert_eq!(body["stream"], false);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], Role::System.as_str());
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[tokio::test]
    async fn chat_error_status_is_provider_error() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model exploded") }),
        );
        let p = provider(spawn_backend(app).await, &[]);
        let err = p
            .chat(&[Message::user("hi")], &ChatOptions::default())
            .await
            .unwrap_err();
        match err {
            AgentError::Provider { backend, message } => {
                assert_eq!(backend, "ollama");
                assert!(message.contains("500"));
                assert!(message.contains("model exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_unreachable_is_unavailable() {
        let p = provider("http://127.0.0.1:1".into(), &[]);
        let err = p
            .chat(&[Message::user("hi")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn embed_falls_back_across_fields_and_models() {
        let app = Router::new().route(
            "/api/embeddings",
            post(|Json(body): Json<Value>| async move {
                let model = body["model"].as_str().unwrap_or_default().to_string();
                match (model.as_str(), body.get("input").is_some()) {
                    // primary model is missing on this host
                    ("nomic-embed-text", _) => {
                        (StatusCode::NOT_FOUND, Json(json!({"error": "not found"})))
                    }
                    // fallback only understands the newer field name
                    ("mxbai-embed-large", true) => {
                        (StatusCode::OK, Json(json!({"embeddings": [[0.25, 0.75]]})))
                    }
                    _ => (StatusCode::OK, Json(json!({"embedding": []}))),
                }
            }),
        );
        let p = provider(spawn_backend(app).await, &["mxbai-embed-large"]);
        let vectors = p.embed(&["alpha".into(), "beta".into()]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.25, 0.75], vec![0.25, 0.75]]);
    }

    #[tokio::test]
    async fn embed_total_failure_yields_zero_vector() {
        let app = Router::new().route(
            "/api/embeddings",
            post(|| async { (StatusCode::BAD_GATEWAY, "down") }),
        );
        let p = provider(spawn_backend(app).await, &["mxbai-embed-large"]);
        let vectors = p.embed(&["alpha".into()]).await.unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), ZERO_VECTOR_DIM);
        assert!(vectors[0].iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn embed_sends_text_under_prompt_first() {
        let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
        let seen_in = seen.clone();
        let app = Router::new().route(
            "/api/embeddings",
            post(move |Json(body): Json<Value>| {
                let seen = seen_in.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    Json(json!({"embedding": [1.0]}))
                }
            }),
        );
        let p = provider(spawn_backend(app).await, &[]);
        p.embed(&["gamma".into()]).await.unwrap();

        let bodies = seen.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(prompt_of(&bodies[0]), Some("gamma"));
        assert!(bodies[0].get("prompt").is_some());
    }
}
