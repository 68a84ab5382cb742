//! Web search tool backed by the DuckDuckGo instant-answer API.

use std::time::Duration;

use agent_core::{Result, Tool, ToolContext};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::http::{build_client, send_json};

const BACKEND: &str = "duckduckgo";

/// Default instant-answer endpoint
pub const DEFAULT_SEARCH_URL: &str = "https://api.duckduckgo.com/";

/// Results rendered per query
pub const MAX_RESULTS: usize = 5;

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    related_topics: Vec<RelatedTopic>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct RelatedTopic {
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
    /// Present on topic groups instead of `text`
    topics: Vec<RelatedTopic>,
}

/// One rendered search hit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub href: String,
    pub body: String,
}

impl InstantAnswer {
    fn hits(self, limit: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        if !self.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: self.heading,
                href: self.abstract_url,
                body: self.abstract_text,
            });
        }

        let topics = self
            .related_topics
            .into_iter()
            .flat_map(|t| if t.topics.is_empty() { vec![t] } else { t.topics });
        for topic in topics {
            if topic.text.is_empty() {
                continue;
            }
            let title = topic
                .text
                .split(" - ")
                .next()
                .unwrap_or(&topic.text)
                .to_string();
            hits.push(SearchHit {
                title,
                href: topic.first_url,
                body: topic.text,
            });
        }

        hits.truncate(limit);
        hits
    }
}

/// Render hits the way the model sees them
pub fn render_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results.".into();
    }
    let lines: Vec<String> = hits
        .iter()
        .map(|h| format!("- {}: {}\n  {}", h.title, h.href, h.body))
        .collect();
    format!("Top results:\n{}", lines.join("\n"))
}

/// `web_search` tool
pub struct WebSearchTool {
    client: Client,
    base_url: String,
}

impl WebSearchTool {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_SEARCH_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(BACKEND, timeout)?,
            base_url: base_url.into(),
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let request = self.client.get(&self.base_url).query(&[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ]);
        let answer: InstantAnswer = send_json(BACKEND, request).await?;
        Ok(answer.hits(MAX_RESULTS))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web and return the top results"
    }

    async fn execute(&self, input: &str, _ctx: &ToolContext) -> Result<String> {
        match self.search(input.trim()).await {
            Ok(hits) => Ok(render_hits(&hits)),
            Err(e) => {
                tracing::warn!(error = %e, "web search failed");
                Ok(format!("Search error: {e}"))
            }
        }
    }
}
