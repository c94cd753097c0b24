use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    agents::{AgentAdapter, AgentError, AgentInput, AgentOutput, AgentRole},
    verdict::ScenarioResult,
};

type ResponderFn = dyn Fn(&AgentInput) -> Result<AgentOutput, AgentError> + Send + Sync;

/// Deterministic participant: replays canned replies, or answers through a
/// closure. Useful for tests and for file-defined scenarios.
pub struct ScriptedAgent {
    name: String,
    roles: Vec<AgentRole>,
    criteria: Vec<String>,
    replies: Mutex<VecDeque<AgentOutput>>,
    fallback: Option<AgentOutput>,
    responder: Option<Arc<ResponderFn>>,
    failure: Option<String>,
    verdict_after: Option<(usize, ScenarioResult)>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new<I>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = AgentRole>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().collect(),
            criteria: Vec::new(),
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
            responder: None,
            failure: None,
            verdict_after: None,
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_fn<I, F>(name: impl Into<String>, roles: I, responder: F) -> Self
    where
        I: IntoIterator<Item = AgentRole>,
        F: Fn(&AgentInput) -> Result<AgentOutput, AgentError> + Send + Sync + 'static,
    {
        let mut agent = Self::new(name, roles);
        agent.responder = Some(Arc::new(responder));
        agent
    }

    /// Replies handed out in order, one per call.
    pub fn with_replies<I, O>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<AgentOutput>,
    {
        if let Ok(mut queue) = self.replies.lock() {
            queue.extend(replies.into_iter().map(Into::into));
        }
        self
    }

    /// Reply used once the queued replies run out.
    pub fn repeating(mut self, reply: impl Into<AgentOutput>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Every call fails with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Returns `verdict` once the shared history holds at least `messages`
    /// entries, or whenever a verdict is demanded.
    pub fn with_verdict_after(mut self, messages: usize, verdict: ScenarioResult) -> Self {
        self.verdict_after = Some((messages, verdict));
        self
    }

    pub fn with_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of times `call` has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, input: &AgentInput) -> Result<AgentOutput, AgentError> {
        if let Some(message) = &self.failure {
            return Err(AgentError::other(message.clone()));
        }

        if let Some((threshold, verdict)) = &self.verdict_after {
            if input.must_render_verdict || input.history.len() >= *threshold {
                return Ok(AgentOutput::Verdict(verdict.clone()));
            }
        }

        if let Some(responder) = &self.responder {
            return responder(input);
        }

        let queued = self
            .replies
            .lock()
            .map_err(|_| AgentError::other("scripted reply queue poisoned"))?
            .pop_front();

        queued
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| AgentError::other(format!("no more scripted responses for {}", self.name)))
    }
}

#[async_trait]
impl AgentAdapter for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn roles(&self) -> &[AgentRole] {
        &self.roles
    }

    fn criteria(&self) -> &[String] {
        &self.criteria
    }

    async fn call(&self, input: AgentInput) -> Result<AgentOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::select! {
                _ = input.cancellation.cancelled() => return Err(AgentError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }

        self.respond(&input)
    }
}
