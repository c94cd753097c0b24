use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::types::ChatMessage;

/// Terminal outcome of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub success: bool,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub passed_criteria: Vec<String>,
    #[serde(default)]
    pub failed_criteria: Vec<String>,
    #[serde(default, with = "duration_ms")]
    pub total_time: Duration,
    #[serde(default, with = "duration_ms")]
    pub agent_time: Duration,
}

impl ScenarioResult {
    pub fn success(reasoning: impl Into<String>) -> Self {
        Self::new(true, reasoning)
    }

    pub fn failure(reasoning: impl Into<String>) -> Self {
        Self::new(false, reasoning)
    }

    fn new(success: bool, reasoning: impl Into<String>) -> Self {
        Self {
            success,
            messages: Vec::new(),
            reasoning: reasoning.into(),
            passed_criteria: Vec::new(),
            failed_criteria: Vec::new(),
            total_time: Duration::ZERO,
            agent_time: Duration::ZERO,
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_passed_criteria(mut self, criteria: Vec<String>) -> Self {
        self.passed_criteria = criteria;
        self
    }

    pub fn with_failed_criteria(mut self, criteria: Vec<String>) -> Self {
        self.failed_criteria = criteria;
        self
    }

    pub fn with_timing(mut self, total_time: Duration, agent_time: Duration) -> Self {
        self.total_time = total_time;
        self.agent_time = agent_time;
        self
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "PASSED" } else { "FAILED" };
        writeln!(f, "scenario {status}")?;
        writeln!(f, "  reasoning: {}", self.reasoning)?;

        for criterion in &self.passed_criteria {
            writeln!(f, "  [x] {criterion}")?;
        }
        for criterion in &self.failed_criteria {
            writeln!(f, "  [ ] {criterion}")?;
        }

        writeln!(f, "  messages: {}", self.messages.len())?;
        write!(
            f,
            "  time: {:.2}s total, {:.2}s in agent",
            self.total_time.as_secs_f64(),
            self.agent_time.as_secs_f64()
        )
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
