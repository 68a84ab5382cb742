//! Runtime configuration
//!
//! Built once at startup and passed into provider constructors. Nothing in
//! this crate reads the process environment after construction.

use std::time::Duration;

use agent_core::{AgentError, Result};

/// Chat/embedding backends known to the runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Local runtime, no credentials
    Ollama,
    OpenAi,
    Gemini,
}

/// Order in which credentialed backends are tried before the local one
pub const FALLBACK_CHAIN: [BackendKind; 3] =
    [BackendKind::OpenAi, BackendKind::Gemini, BackendKind::Ollama];

impl BackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Parse a backend name. Unknown names resolve to the local backend.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "ollama" => Self::Ollama,
            "openai" => Self::OpenAi,
            "gemini" | "google" => Self::Gemini,
            other => {
                tracing::warn!(backend = other, "unknown backend, using ollama");
                Self::Ollama
            }
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    pub base_url: String,
    pub chat_model: String,
    pub embed_model: String,
    /// Tried in order when the primary embedding model yields nothing
    pub embed_fallbacks: Vec<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".into(),
            chat_model: "llama3.1:8b".into(),
            embed_model: "nomic-embed-text".into(),
            embed_fallbacks: vec!["mxbai-embed-large".into(), "nomic-embed-text".into()],
        }
    }
}

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embed_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".into(),
            chat_model: "gpt-4o-mini".into(),
            embed_model: "text-embedding-3-small".into(),
        }
    }
}

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embed_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".into(),
            chat_model: "gemini-2.0-flash".into(),
            embed_model: "text-embedding-004".into(),
        }
    }
}

/// Everything the providers need, resolved once
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Requested chat backend
    pub chat_backend: BackendKind,
    /// Requested embedding backend
    pub embed_backend: BackendKind,
    pub http_timeout: Duration,
    pub embed_timeout: Duration,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            chat_backend: BackendKind::Ollama,
            embed_backend: BackendKind::Ollama,
            http_timeout: Duration::from_secs(120),
            embed_timeout: Duration::from_secs(120),
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let chat_backend = get("LLM_BACKEND").map_or(defaults.chat_backend, |b| BackendKind::parse(&b));
        let embed_backend = get("EMBED_BACKEND").map_or(chat_backend, |b| BackendKind::parse(&b));

        let ollama = OllamaConfig {
            base_url: get("OLLAMA_BASE_URL").unwrap_or(defaults.ollama.base_url),
            chat_model: get("OLLAMA_MODEL").unwrap_or(defaults.ollama.chat_model),
            embed_model: get("OLLAMA_EMBED_MODEL").unwrap_or(defaults.ollama.embed_model),
            embed_fallbacks: get("OLLAMA_EMBED_FALLBACKS").map_or(
                defaults.ollama.embed_fallbacks,
                |list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(String::from)
                        .collect()
                },
            ),
        };

        let openai = OpenAiConfig {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai.base_url),
            chat_model: get("OPENAI_MODEL").unwrap_or(defaults.openai.chat_model),
            embed_model: get("OPENAI_EMBED_MODEL").unwrap_or(defaults.openai.embed_model),
        };

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini.base_url),
            chat_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini.chat_model),
            embed_model: get("GEMINI_EMBED_MODEL").unwrap_or(defaults.gemini.embed_model),
        };

        Ok(Self {
            chat_backend,
            embed_backend,
            http_timeout: parse_secs("HTTP_TIMEOUT", get("HTTP_TIMEOUT"), defaults.http_timeout)?,
            embed_timeout: parse_secs("EMBED_TIMEOUT", get("EMBED_TIMEOUT"), defaults.embed_timeout)?,
            ollama,
            openai,
            gemini,
        })
    }

    /// Whether the credentials `kind` needs are present
    pub const fn has_credentials(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Ollama => true,
            BackendKind::OpenAi => self.openai.api_key.is_some(),
            BackendKind::Gemini => self.gemini.api_key.is_some(),
        }
    }

    /// Apply the fallback policy: the requested backend if usable, otherwise
    /// the first usable backend in [`FALLBACK_CHAIN`].
    pub fn resolve(&self, requested: BackendKind) -> BackendKind {
        if self.has_credentials(requested) {
            return requested;
        }
        let chosen = FALLBACK_CHAIN
            .into_iter()
            .find(|kind| self.has_credentials(*kind))
            .unwrap_or(BackendKind::Ollama);
        tracing::warn!(
            requested = %requested,
            using = %chosen,
            "backend credentials missing, falling back"
        );
        chosen
    }
}

fn parse_secs(key: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    let Some(raw) = value else {
        return Ok(default);
    };
    let secs: f64 = raw
        .parse()
        .map_err(|_| AgentError::Config(format!("{key} must be a number of seconds, got '{raw}'")))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(AgentError::Config(format!("{key} must be positive, got '{raw}'")));
    }
    Ok(Duration::from_secs_f64(secs))
}
