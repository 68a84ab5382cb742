//! Shared HTTP plumbing for the backend adapters.

use std::time::Duration;

use agent_core::{AgentError, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const BODY_EXCERPT_CHARS: usize = 300;

/// Client with an overall request timeout
pub(crate) fn build_client(backend: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::Config(format!("{backend} http client: {e}")))
}

pub(crate) fn transport_error(backend: &str, err: &reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() {
        AgentError::unavailable(backend, err.to_string())
    } else {
        AgentError::provider(backend, err.to_string())
    }
}

/// Send `request`, require a 2xx status, and decode the JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    backend: &str,
    request: RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(backend, &e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgentError::provider(
            backend,
            format!("{status}: {}", excerpt(&body)),
        ));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AgentError::provider(backend, format!("unexpected response body: {e}")))
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
    cut.push('…');
    cut
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
