//! Facts a run announces to the outside world: started, message snapshot,
//! finished. How they are persisted is up to the [`EventReporter`].

use serde::{Deserialize, Serialize};

use crate::types::ChatMessage;

pub mod bus;
pub mod reporter;

pub use bus::EventBus;
pub use reporter::{EventReporter, HttpEventReporter, MemoryReporter, ReportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
    Error,
    Cancelled,
}

/// Identifiers shared by every event of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunIds {
    pub batch_run_id: String,
    pub scenario_id: String,
    pub scenario_run_id: String,
}

impl RunIds {
    pub fn generate(batch_run_id: impl Into<String>) -> Self {
        Self {
            batch_run_id: batch_run_id.into(),
            scenario_id: crate::ids::scenario_id(),
            scenario_run_id: crate::ids::scenario_run_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScenarioEvent {
    #[serde(rename = "SCENARIO_RUN_STARTED")]
    RunStarted {
        #[serde(flatten)]
        ids: RunIds,
        timestamp: i64,
        metadata: RunMetadata,
    },
    #[serde(rename = "SCENARIO_MESSAGE_SNAPSHOT")]
    MessageSnapshot {
        #[serde(flatten)]
        ids: RunIds,
        timestamp: i64,
        messages: Vec<ChatMessage>,
    },
    #[serde(rename = "SCENARIO_RUN_FINISHED")]
    RunFinished {
        #[serde(flatten)]
        ids: RunIds,
        timestamp: i64,
        status: RunStatus,
    },
}

impl ScenarioEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ScenarioEvent::RunStarted { .. } => "SCENARIO_RUN_STARTED",
            ScenarioEvent::MessageSnapshot { .. } => "SCENARIO_MESSAGE_SNAPSHOT",
            ScenarioEvent::RunFinished { .. } => "SCENARIO_RUN_FINISHED",
        }
    }

    pub fn ids(&self) -> &RunIds {
        match self {
            ScenarioEvent::RunStarted { ids, .. }
            | ScenarioEvent::MessageSnapshot { ids, .. }
            | ScenarioEvent::RunFinished { ids, .. } => ids,
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Publishes the events of a single run onto a shared bus.
#[derive(Clone)]
pub struct RunEmitter {
    bus: EventBus,
    ids: RunIds,
}

impl RunEmitter {
    pub fn new(bus: EventBus, ids: RunIds) -> Self {
        Self { bus, ids }
    }

    pub fn ids(&self) -> &RunIds {
        &self.ids
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn run_started(&self, name: &str, description: &str) {
        self.bus.publish(ScenarioEvent::RunStarted {
            ids: self.ids.clone(),
            timestamp: now_millis(),
            metadata: RunMetadata {
                name: name.to_string(),
                description: (!description.is_empty()).then(|| description.to_string()),
            },
        });
    }

    pub fn message_snapshot(&self, messages: &[ChatMessage]) {
        self.bus.publish(ScenarioEvent::MessageSnapshot {
            ids: self.ids.clone(),
            timestamp: now_millis(),
            messages: messages.to_vec(),
        });
    }

    pub fn run_finished(&self, status: RunStatus) {
        self.bus.publish(ScenarioEvent::RunFinished {
            ids: self.ids.clone(),
            timestamp: now_millis(),
            status,
        });
    }
}
