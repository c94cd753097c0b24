use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use reqwest::Client;

use super::ScenarioEvent;
use crate::config::EventsConfig;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait EventReporter: Send + Sync {
    async fn report(&self, event: &ScenarioEvent) -> Result<(), ReportError>;
}

/// POSTs every event as JSON to a single endpoint.
#[derive(Debug)]
pub struct HttpEventReporter {
    client: Client,
    endpoint: Option<String>,
    api_key: String,
    warned_missing_endpoint: AtomicBool,
}

impl HttpEventReporter {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.filter(|endpoint| !endpoint.is_empty()),
            api_key: api_key.unwrap_or_default(),
            warned_missing_endpoint: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &EventsConfig) -> Self {
        Self::new(config.endpoint.clone(), config.api_key.clone())
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("SCENARIO_EVENTS_ENDPOINT").ok(),
            std::env::var("LANGWATCH_API_KEY").ok(),
        )
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

#[async_trait]
impl EventReporter for HttpEventReporter {
    async fn report(&self, event: &ScenarioEvent) -> Result<(), ReportError> {
        let Some(endpoint) = &self.endpoint else {
            if !self.warned_missing_endpoint.swap(true, Ordering::Relaxed) {
                tracing::warn!("no SCENARIO_EVENTS_ENDPOINT configured, skipping event posting");
            }
            return Ok(());
        };

        tracing::debug!(event = event.kind(), %endpoint, "posting scenario event");

        let response = self
            .client
            .post(endpoint)
            .header("X-Auth-Token", &self.api_key)
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(event = event.kind(), status = status.as_u16(), "scenario event posted");
        Ok(())
    }
}

/// Keeps every event in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    events: Arc<Mutex<Vec<ScenarioEvent>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScenarioEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventReporter for MemoryReporter {
    async fn report(&self, event: &ScenarioEvent) -> Result<(), ReportError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        Ok(())
    }
}
