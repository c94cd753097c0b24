use thiserror::Error;

use crate::agents::AgentRole;

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("missing API key: set the {0} environment variable")]
    MissingApiKey(&'static str),

    #[error("invalid response from provider: {0}")]
    InvalidResponse(&'static str),

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

/// Configuration problems. These surface before (or instead of) a verdict and
/// are never converted into a failed run.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario name is required")]
    MissingName,

    #[error("scenario description is required")]
    MissingDescription,

    #[error("at least one agent is required")]
    NoParticipants,

    #[error("max turns must be at least 1, got {0}")]
    InvalidMaxTurns(usize),

    #[error("{}", no_participant_message(*role, content.as_deref()))]
    NoParticipantForRole {
        role: AgentRole,
        content: Option<String>,
    },

    #[error("invalid project configuration: {0}")]
    Config(String),
}

fn no_participant_message(role: AgentRole, content: Option<&str>) -> String {
    let adapter = match role {
        AgentRole::User => "a UserSimulatorAgent",
        AgentRole::Agent => "an agent under test",
        AgentRole::Judge => "a JudgeAgent",
    };

    match content {
        Some(content) => format!(
            "cannot generate a message for role `{role}` with content `{content}` because no agent with this role was found, please add {adapter} to the scenario agents"
        ),
        None => format!(
            "cannot generate a message for role `{role}` because no agent with this role was found, please add {adapter} to the scenario agents"
        ),
    }
}
