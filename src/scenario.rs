//! Scenario definition and the runner that wraps an execution with event
//! reporting.

use std::{fmt, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{
    agents::AgentAdapter,
    error::ScenarioError,
    events::{EventBus, RunEmitter, RunIds, RunStatus},
    execution::ScenarioExecution,
    ids,
    script::ScriptStep,
    verdict::ScenarioResult,
};

pub const DEFAULT_MAX_TURNS: usize = 10;

#[derive(Clone)]
pub struct ScenarioConfig {
    pub name: String,
    pub description: String,
    pub criteria: Vec<String>,
    pub agents: Vec<Arc<dyn AgentAdapter>>,
    /// Steps to run; `None` plays the conversation out freely.
    pub script: Option<Vec<ScriptStep>>,
    pub max_turns: usize,
    /// Fixed thread id; a fresh one is generated per run otherwise.
    pub thread_id: Option<String>,
    pub verbose: bool,
    pub debug: bool,
}

impl fmt::Debug for ScenarioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let agents: Vec<&str> = self.agents.iter().map(|agent| agent.name()).collect();
        f.debug_struct("ScenarioConfig")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("criteria", &self.criteria)
            .field("agents", &agents)
            .field("script", &self.script)
            .field("max_turns", &self.max_turns)
            .field("thread_id", &self.thread_id)
            .field("verbose", &self.verbose)
            .field("debug", &self.debug)
            .finish()
    }
}

impl ScenarioConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            criteria: Vec::new(),
            agents: Vec::new(),
            script: None,
            max_turns: DEFAULT_MAX_TURNS,
            thread_id: None,
            verbose: false,
            debug: false,
        }
    }

    pub fn with_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_agent(mut self, agent: impl AgentAdapter + 'static) -> Self {
        self.agents.push(Arc::new(agent));
        self
    }

    pub fn with_shared_agent(mut self, agent: Arc<dyn AgentAdapter>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_agents(mut self, agents: Vec<Arc<dyn AgentAdapter>>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn with_script(mut self, script: Vec<ScriptStep>) -> Self {
        self.script = Some(script);
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::MissingName);
        }
        if self.description.trim().is_empty() {
            return Err(ScenarioError::MissingDescription);
        }
        if self.max_turns < 1 {
            return Err(ScenarioError::InvalidMaxTurns(self.max_turns));
        }
        if self.agents.is_empty() {
            return Err(ScenarioError::NoParticipants);
        }
        Ok(())
    }
}

/// Runs scenarios, announcing each run on an optional event bus.
#[derive(Clone, Default)]
pub struct ScenarioRunner {
    events: Option<EventBus>,
    batch_run_id: Option<String>,
    cancellation: Option<CancellationToken>,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn with_batch_run_id(mut self, batch_run_id: impl Into<String>) -> Self {
        self.batch_run_id = Some(batch_run_id.into());
        self
    }

    /// Shared by every run started from this runner.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub async fn run(&self, config: ScenarioConfig) -> Result<ScenarioResult, ScenarioError> {
        let emitter = self.events.as_ref().map(|bus| {
            let batch_run_id = ids::batch_run_id(self.batch_run_id.as_deref());
            RunEmitter::new(bus.clone(), RunIds::generate(batch_run_id))
        });
        if let Some(emitter) = &emitter {
            emitter.run_started(&config.name, &config.description);
        }

        if let Err(error) = config.validate() {
            tracing::warn!(scenario = %config.name, %error, "scenario rejected");
            if let Some(emitter) = &emitter {
                emitter.run_finished(RunStatus::Error);
                emitter.bus().drain().await;
            }
            return Err(error);
        }

        let verbose = config.verbose;
        let name = config.name.clone();
        let mut execution = ScenarioExecution::new(config);
        if let Some(token) = &self.cancellation {
            execution = execution.with_cancellation(token.child_token());
        }
        if let Some(emitter) = &emitter {
            execution = execution.with_emitter(emitter.clone());
        }

        tracing::info!(scenario = %name, "running scenario");
        let outcome = execution.execute().await;

        if let Some(emitter) = &emitter {
            let status = match &outcome {
                Ok(result) => execution.run_status(result),
                Err(_) => RunStatus::Error,
            };
            emitter.run_finished(status);
            emitter.bus().drain().await;
        }

        let result = outcome?;
        if verbose {
            tracing::info!(scenario = %name, "{result}");
        }
        tracing::info!(
            scenario = %name,
            success = result.success,
            total_ms = result.total_time.as_millis() as u64,
            "scenario finished"
        );
        Ok(result)
    }
}

/// Validates and runs a scenario without event reporting.
pub async fn run(config: ScenarioConfig) -> Result<ScenarioResult, ScenarioError> {
    ScenarioRunner::new().run(config).await
}
