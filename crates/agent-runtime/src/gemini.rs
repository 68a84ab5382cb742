//! Gemini Provider
//!
//! Google Generative Language API. System messages are lifted into
//! `systemInstruction`; the remaining turns alternate between `user` and
//! `model`, with consecutive same-role turns merged.

use std::time::Duration;

use agent_core::{AgentError, ChatOptions, ChatProvider, EmbeddingProvider, Message, Result, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::http::{build_client, join_url, send_json};

const BACKEND: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize, Debug, PartialEq)]
struct Part {
    text: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Split messages into the system instruction and merged user/model turns
fn to_contents(messages: &[Message]) -> (Option<Content>, Vec<Content>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let system_instruction = (!system.is_empty()).then(|| Content {
        role: None,
        parts: vec![Part {
            text: system.join("\n\n"),
        }],
    });

    let mut contents: Vec<Content> = Vec::new();
    for message in messages.iter().filter(|m| m.role != Role::System) {
        let role = match message.role {
            Role::Assistant => "model",
            _ => "user",
        };
        let part = Part {
            text: message.content.clone(),
        };
        match contents.last_mut() {
            Some(last) if last.role == Some(role) => last.parts.push(part),
            _ => contents.push(Content {
                role: Some(role),
                parts: vec![part],
            }),
        }
    }

    (system_instruction, contents)
}

/// Gemini chat/embedding provider
pub struct GeminiProvider {
    chat_client: Client,
    embed_client: Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Fails with a configuration error when no API key is set
    pub fn new(config: GeminiConfig, http_timeout: Duration, embed_timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("GEMINI_API_KEY is not set".into()))?;
        Ok(Self {
            chat_client: build_client(BACKEND, http_timeout)?,
            embed_client: build_client(BACKEND, embed_timeout)?,
            api_key,
            config,
        })
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        BACKEND
    }

    fn default_model(&self) -> &str {
        &self.config.chat_model
    }

    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> Result<String> {
        let model = options.model_or(&self.config.chat_model);
        let (system_instruction, contents) = to_contents(messages);
        let request = GenerateRequest {
            system_instruction,
            contents,
            generation_config: GenerationConfig {
                temperature: options.temperature,
            },
        };

        tracing::debug!(model, messages = messages.len(), "gemini chat");

        let url = join_url(
            &self.config.base_url,
            &format!("/v1beta/{}:generateContent", Self::model_path(model)),
        );
        let response: GenerateResponse = send_json(
            BACKEND,
            self.chat_client
                .post(url)
                .header(API_KEY_HEADER, &self.api_key)
                .json(&request),
        )
        .await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::provider(BACKEND, "response contained no candidates"))?;

        Ok(candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Self::model_path(&self.config.embed_model);
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: model.clone(),
                    content: Content {
                        role: None,
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let url = join_url(
            &self.config.base_url,
            &format!("/v1beta/{model}:batchEmbedContents"),
        );
        let response: BatchEmbedResponse = send_json(
            BACKEND,
            self.embed_client
                .post(url)
                .header(API_KEY_HEADER, &self.api_key)
                .json(&request),
        )
        .await?;

        if response.embeddings.len() != texts.len() {
            return Err(AgentError::provider(
                BACKEND,
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            ));
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}
