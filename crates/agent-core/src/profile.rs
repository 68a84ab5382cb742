//! Agent profiles
//!
//! The read-only view of an agent that a turn consumes. Creating, updating
//! and storing profiles happens outside this crate.

use serde::{Deserialize, Serialize};

/// A named agent: instructions, declared tools, and sampling settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// System instructions
    #[serde(alias = "system_prompt", default = "default_instructions")]
    pub instructions: String,

    /// Names of the tools this agent may call
    #[serde(default)]
    pub tools: Vec<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Model override; the backend default is used when unset
    #[serde(default)]
    pub model: Option<String>,
}

fn default_instructions() -> String {
    "You are a helpful assistant.".into()
}

const fn default_temperature() -> f32 {
    0.2
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            instructions: instructions.into(),
            tools: Vec::new(),
            temperature: default_temperature(),
            model: None,
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn declares_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    /// Add a tool name if not declared yet; returns whether it was added.
    pub fn add_tool(&mut self, name: &str) -> bool {
        if self.declares_tool(name) {
            return false;
        }
        self.tools.push(name.to_string());
        true
    }
}

/// Whether the model may call tools during a turn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolsMode {
    Off,
    #[default]
    Auto,
}
