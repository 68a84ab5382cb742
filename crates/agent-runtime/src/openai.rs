//! OpenAI Provider
//!
//! Chat completions and embeddings over the OpenAI REST API with bearer auth.

use std::time::Duration;

use agent_core::{AgentError, ChatOptions, ChatProvider, EmbeddingProvider, Message, Result, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::http::{build_client, join_url, send_json};

const BACKEND: &str = "openai";

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        // tool results go back as user turns; the tool role needs a call id
        let role = match message.role {
            Role::System => "system",
            Role::Assistant => "assistant",
            Role::User | Role::Tool => "user",
        };
        Self {
            role,
            content: &message.content,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI chat/embedding provider
pub struct OpenAiProvider {
    chat_client: Client,
    embed_client: Client,
    api_key: String,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Fails with a configuration error when no API key is set
    pub fn new(config: OpenAiConfig, http_timeout: Duration, embed_timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("OPENAI_API_KEY is not set".into()))?;
        Ok(Self {
            chat_client: build_client(BACKEND, http_timeout)?,
            embed_client: build_client(BACKEND, embed_timeout)?,
            api_key,
            config,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
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
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: options.temperature,
        };

        tracing::debug!(model, messages = messages.len(), "openai chat");

        let url = join_url(&self.config.base_url, "/v1/chat/completions");
        let response: ChatResponse = send_json(
            BACKEND,
            self.chat_client
                .post(url)
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| AgentError::provider(BACKEND, "response contained no choices"))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.config.embed_model,
            input: texts,
        };
        let url = join_url(&self.config.base_url, "/v1/embeddings");
        let mut response: EmbeddingResponse = send_json(
            BACKEND,
            self.embed_client
                .post(url)
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        if response.data.len() != texts.len() {
            return Err(AgentError::provider(
                BACKEND,
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    response.data.len()
                ),
            ));
        }

        response.data.sort_by_key(|item| item.index);
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }
}
