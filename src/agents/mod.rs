//! Participants of a scenario and the contract the engine calls them through.
//!
//! The engine only knows an adapter's declared roles and its `call`; what an
//! adapter says is entirely its own business.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest, CompletionResponse, MessageRole},
    verdict::ScenarioResult,
    LLMError,
};

pub mod judge;
pub mod prompts;
pub mod provider_agent;
pub mod scripted;
pub mod user_simulator;

pub use judge::JudgeAgent;
pub use provider_agent::ProviderAgent;
pub use scripted::ScriptedAgent;
pub use user_simulator::UserSimulatorAgent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    #[serde(alias = "User")]
    User,
    #[serde(alias = "Agent")]
    Agent,
    #[serde(alias = "Judge")]
    Judge,
}

impl AgentRole {
    /// Order in which roles act within a turn.
    pub const PRECEDENCE: [AgentRole; 3] = [AgentRole::User, AgentRole::Agent, AgentRole::Judge];

    /// Role given to plain-text output produced while acting in this role.
    pub fn message_role(self) -> MessageRole {
        match self {
            AgentRole::User => MessageRole::User,
            AgentRole::Agent | AgentRole::Judge => MessageRole::Assistant,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentRole::User => "User",
            AgentRole::Agent => "Agent",
            AgentRole::Judge => "Judge",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] LLMError),
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),
    #[error("no response content from LLM")]
    EmptyResponse,
    #[error("call cancelled")]
    Cancelled,
    #[error("invalid verdict: {0}")]
    InvalidVerdict(String),
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// What the scenario is about, as far as a participant needs to know.
#[derive(Debug, Clone, Default)]
pub struct ScenarioInfo {
    pub name: String,
    pub description: String,
    pub criteria: Vec<String>,
    pub max_turns: usize,
}

/// Envelope handed to a participant each time it is asked to act.
#[derive(Debug, Clone)]
pub struct AgentInput {
    pub thread_id: String,
    /// Full shared history.
    pub history: Vec<ChatMessage>,
    /// Messages produced by others since this participant last acted.
    pub unseen_messages: Vec<ChatMessage>,
    pub requested_role: AgentRole,
    pub must_render_verdict: bool,
    pub turn: usize,
    pub scenario: ScenarioInfo,
    pub cancellation: CancellationToken,
}

impl AgentInput {
    pub fn is_last_turn(&self) -> bool {
        self.scenario.max_turns > 0 && self.turn >= self.scenario.max_turns
    }
}

#[derive(Debug, Clone)]
pub enum AgentOutput {
    Text(String),
    Message(ChatMessage),
    Messages(Vec<ChatMessage>),
    Verdict(ScenarioResult),
}

impl AgentOutput {
    /// Messages to append to history, or the verdict that ends the run.
    pub fn into_messages(self, role: AgentRole) -> Result<Vec<ChatMessage>, ScenarioResult> {
        match self {
            AgentOutput::Text(text) => Ok(vec![ChatMessage::new(role.message_role(), text)]),
            AgentOutput::Message(message) => Ok(vec![message]),
            AgentOutput::Messages(messages) => Ok(messages),
            AgentOutput::Verdict(result) => Err(result),
        }
    }
}

impl From<String> for AgentOutput {
    fn from(value: String) -> Self {
        AgentOutput::Text(value)
    }
}

impl From<&str> for AgentOutput {
    fn from(value: &str) -> Self {
        AgentOutput::Text(value.to_string())
    }
}

impl From<ChatMessage> for AgentOutput {
    fn from(value: ChatMessage) -> Self {
        AgentOutput::Message(value)
    }
}

impl From<Vec<ChatMessage>> for AgentOutput {
    fn from(value: Vec<ChatMessage>) -> Self {
        AgentOutput::Messages(value)
    }
}

impl From<ScenarioResult> for AgentOutput {
    fn from(value: ScenarioResult) -> Self {
        AgentOutput::Verdict(value)
    }
}

#[async_trait]
pub trait AgentAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn roles(&self) -> &[AgentRole];

    /// Criteria this participant judges against. Only judges carry any.
    fn criteria(&self) -> &[String] {
        &[]
    }

    async fn call(&self, input: AgentInput) -> Result<AgentOutput, AgentError>;

    fn has_role(&self, role: AgentRole) -> bool {
        self.roles().contains(&role)
    }
}

/// Runs a completion, giving up as soon as `cancellation` fires.
pub(crate) async fn complete_cancellable(
    provider: &dyn LLMProvider,
    request: CompletionRequest,
    cancellation: &CancellationToken,
) -> Result<CompletionResponse, AgentError> {
    tokio::select! {
        _ = cancellation.cancelled() => Err(AgentError::Cancelled),
        response = provider.complete(request) => Ok(response?),
    }
}
