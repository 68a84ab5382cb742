//! Turn Orchestration
//!
//! Drives one chat turn through a fixed sequence of states:
//!
//! ```text
//! BUILD_CONTEXT -> FIRST_TURN -> [DETECT_TOOL -> TOOL_DISPATCH -> FINAL_TURN] -> DONE
//! ```
//!
//! The bracketed branch runs only when tools are enabled, the agent declares
//! tools, and the first reply carries a call to one of them. At most one tool
//! fires per turn.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::grounding::Grounding;
use crate::message::{Conversation, Message};
use crate::profile::{AgentProfile, ToolsMode};
use crate::provider::{ChatOptions, ChatProvider};
use crate::tool::{ToolContext, ToolRegistry};
use crate::tool_call::detect_tool_call;

/// Number of snippets retrieved for grounding
pub const DEFAULT_RETRIEVAL_K: usize = 4;

/// Orchestrator configuration
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Snippets requested from the grounding source per turn
    pub retrieval_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retrieval_k: DEFAULT_RETRIEVAL_K,
        }
    }
}

/// Result of one turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub content: String,

    /// Tool that fired, if the tool branch ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_tool: Option<String>,

    /// Input handed to that tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<String>,
}

/// Render the directive appended to the system prompt when tools are enabled.
pub fn tools_directive(tool_names: &[String]) -> String {
    format!(
        "You have access to the following tools: {}.\n\
         When you want to call a tool, reply with ONLY this JSON (no extra text):\n\
         {{\"tool\":\"<tool_name>\",\"input\":\"<text>\"}}\n\
         After the tool result is provided, produce a concise final answer for the user.\n",
        tool_names.join(", ")
    )
}

/// The turn driver
pub struct Orchestrator {
    chat: Arc<dyn ChatProvider>,
    tools: Arc<ToolRegistry>,
    grounding: Option<Arc<dyn Grounding>>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(chat: Arc<dyn ChatProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            chat,
            tools,
            grounding: None,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_grounding(mut self, grounding: Arc<dyn Grounding>) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn for `agent` over the caller-supplied `history`.
    pub async fn run_turn(
        &self,
        agent: &AgentProfile,
        history: &[Message],
        mode: ToolsMode,
    ) -> Result<TurnOutcome> {
        let tools_enabled = mode == ToolsMode::Auto && !agent.tools.is_empty();
        let mut conversation = self.build_context(agent, history, tools_enabled).await;
        let options = ChatOptions::new(agent.temperature).with_model(agent.model.clone());

        let first = self.chat.chat(conversation.messages(), &options).await?;

        if !tools_enabled {
            return Ok(TurnOutcome::plain(first));
        }

        let Some(call) = detect_tool_call(&first, &agent.tools) else {
            return Ok(TurnOutcome::plain(first));
        };

        tracing::info!(agent = %agent.id, tool = %call.name, "dispatching tool call");
        let ctx = ToolContext::for_agent(&agent.id);
        let result = self.tools.invoke(&call.name, &call.input, &ctx).await;

        conversation.push(Message::assistant(first));
        conversation.push(Message::tool(format!(
            "Tool {} result:\n{}",
            call.name, result
        )));

        let content = self
            .chat
            .chat(conversation.messages(), &options)
            .await
            .inspect_err(|e| {
                tracing::error!(agent = %agent.id, error = %e, "final turn failed");
            })?;

        Ok(TurnOutcome {
            content,
            used_tool: Some(call.name),
            tool_input: Some(call.input),
        })
    }

    async fn build_context(
        &self,
        agent: &AgentProfile,
        history: &[Message],
        tools_enabled: bool,
    ) -> Conversation {
        let mut system = agent.instructions.clone();
        if tools_enabled {
            system.push_str("\n\n");
            system.push_str(&tools_directive(&agent.tools));
        }

        let mut conversation = Conversation::with_system_prompt(system);
        conversation.extend_from_slice(history);

        if let Some(context) = self.grounding_context(agent, &conversation).await {
            conversation.push(Message::system(context));
        }

        conversation
    }

    async fn grounding_context(
        &self,
        agent: &AgentProfile,
        conversation: &Conversation,
    ) -> Option<String> {
        let grounding = self.grounding.as_ref()?;
        let query = conversation.last_user_content().filter(|q| !q.trim().is_empty())?;

        if !grounding.has_index(&agent.id).await {
            return None;
        }

        let context = grounding
            .context(&agent.id, query, self.config.retrieval_k)
            .await;
        if context.is_empty() {
            tracing::debug!(agent = %agent.id, "no grounding snippets");
            None
        } else {
            Some(context)
        }
    }
}

impl TurnOutcome {
    fn plain(content: String) -> Self {
        Self {
            content,
            used_tool: None,
            tool_input: None,
        }
    }
}

/// Builder for an [`Orchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    chat: Option<Arc<dyn ChatProvider>>,
    tools: ToolRegistry,
    grounding: Option<Arc<dyn Grounding>>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat(mut self, chat: Arc<dyn ChatProvider>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn grounding(mut self, grounding: Arc<dyn Grounding>) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub const fn retrieval_k(mut self, k: usize) -> Self {
        self.config.retrieval_k = k;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let chat = self
            .chat
            .ok_or_else(|| AgentError::Config("Chat provider is required".into()))?;

        Ok(Orchestrator {
            chat,
            tools: Arc::new(self.tools),
            grounding: self.grounding,
            config: self.config,
        })
    }
}
