//! File-defined scenarios: scripted participants, a script and the outcome
//! the run is expected to produce.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    agents::{AgentAdapter, AgentRole, ScriptedAgent},
    scenario::{ScenarioConfig, DEFAULT_MAX_TURNS},
    script::ScriptStep,
    types::{ChatMessage, MessageRole},
    verdict::ScenarioResult,
};

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalScenario {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default)]
    pub max_turns: Option<usize>,
    pub participants: Vec<EvalParticipant>,
    /// Omitted: the conversation plays out freely.
    #[serde(default)]
    pub script: Option<Vec<EvalStep>>,
    #[serde(default)]
    pub expect: Expectation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalParticipant {
    pub name: String,
    pub roles: Vec<AgentRole>,
    #[serde(default)]
    pub replies: Vec<String>,
    /// Reply used once `replies` runs out.
    #[serde(default)]
    pub repeat: Option<String>,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default)]
    pub verdict_after: Option<ScriptedVerdict>,
    /// Every call fails with this message.
    #[serde(default)]
    pub fail: Option<String>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedVerdict {
    /// History length at which the verdict is returned.
    pub messages: usize,
    pub success: bool,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EvalStep {
    Message { role: MessageRole, content: String },
    User { content: Option<String> },
    Agent { content: Option<String> },
    Judge { content: Option<String> },
    Proceed { turns: Option<usize> },
    Succeed { reasoning: Option<String> },
    Fail { reasoning: Option<String> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub reasoning_contains: Option<String>,
    #[serde(default)]
    pub history_len: Option<usize>,
    /// The run must be rejected with an error containing this text.
    #[serde(default)]
    pub error_contains: Option<String>,
}

impl EvalScenario {
    /// Parses YAML for `.yaml`/`.yml` files and JSON otherwise.
    pub fn from_path(path: &Path) -> Result<Self, EvalError> {
        let content = fs::read_to_string(path).map_err(|source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|source| EvalError::Yaml {
                path: path.to_path_buf(),
                source,
            }),
            _ => serde_json::from_str(&content).map_err(|source| EvalError::Json {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Loads a single file, or every scenario file in a directory sorted by
    /// file name.
    pub fn load(path: &Path) -> Result<Vec<Self>, EvalError> {
        if !path.is_dir() {
            return Ok(vec![Self::from_path(path)?]);
        }

        let io_error = |source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(path).map_err(io_error)? {
            let file = entry.map_err(io_error)?.path();
            if matches!(
                file.extension().and_then(|ext| ext.to_str()),
                Some("yaml" | "yml" | "json")
            ) {
                files.push(file);
            }
        }
        files.sort();

        files.iter().map(|file| Self::from_path(file)).collect()
    }

    pub fn to_config(&self) -> ScenarioConfig {
        let agents: Vec<Arc<dyn AgentAdapter>> = self
            .participants
            .iter()
            .map(|participant| Arc::new(participant.to_agent()) as Arc<dyn AgentAdapter>)
            .collect();

        let mut config = ScenarioConfig::new(&self.name, &self.description)
            .with_criteria(self.criteria.clone())
            .with_agents(agents)
            .with_max_turns(self.max_turns.unwrap_or(DEFAULT_MAX_TURNS));

        if let Some(steps) = &self.script {
            config = config.with_script(steps.iter().map(EvalStep::to_step).collect());
        }
        config
    }
}

impl EvalParticipant {
    pub fn to_agent(&self) -> ScriptedAgent {
        let mut agent = ScriptedAgent::new(&self.name, self.roles.iter().copied())
            .with_replies(self.replies.iter().map(String::as_str))
            .with_criteria(self.criteria.clone());

        if let Some(reply) = &self.repeat {
            agent = agent.repeating(reply.as_str());
        }
        if let Some(verdict) = &self.verdict_after {
            let result = if verdict.success {
                ScenarioResult::success(verdict.reasoning.clone())
            } else {
                ScenarioResult::failure(verdict.reasoning.clone())
            };
            agent = agent.with_verdict_after(verdict.messages, result);
        }
        if let Some(message) = &self.fail {
            agent = agent.failing(message.clone());
        }
        if let Some(latency) = self.latency_ms {
            agent = agent.with_latency(Duration::from_millis(latency));
        }
        agent
    }
}

impl EvalStep {
    pub fn to_step(&self) -> ScriptStep {
        match self {
            EvalStep::Message { role, content } => {
                ScriptStep::message(ChatMessage::new(*role, content.clone()))
            }
            EvalStep::User { content: Some(content) } => ScriptStep::user_says(content.clone()),
            EvalStep::User { content: None } => ScriptStep::user(),
            EvalStep::Agent { content: Some(content) } => ScriptStep::agent_says(content.clone()),
            EvalStep::Agent { content: None } => ScriptStep::agent(),
            EvalStep::Judge { content: Some(content) } => ScriptStep::judge_says(content.clone()),
            EvalStep::Judge { content: None } => ScriptStep::judge(),
            EvalStep::Proceed { turns: Some(turns) } => ScriptStep::proceed_for(*turns),
            EvalStep::Proceed { turns: None } => ScriptStep::proceed(),
            EvalStep::Succeed { reasoning: Some(reasoning) } => ScriptStep::succeed_with(reasoning.clone()),
            EvalStep::Succeed { reasoning: None } => ScriptStep::succeed(),
            EvalStep::Fail { reasoning: Some(reasoning) } => ScriptStep::fail_with(reasoning.clone()),
            EvalStep::Fail { reasoning: None } => ScriptStep::fail(),
        }
    }
}
