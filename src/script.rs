//! Script steps: the ordered instructions a scenario runs through.
//!
//! Each step is an async closure over the live [`ScenarioExecution`]. A step
//! returning a verdict ends the run; returning `None` hands control to the
//! next step.

use std::{fmt, sync::Arc};

use futures_util::future::{BoxFuture, FutureExt};

use crate::{
    agents::AgentRole,
    error::ScenarioError,
    execution::{ProceedOptions, ScenarioExecution},
    types::ChatMessage,
    verdict::ScenarioResult,
};

pub type StepResult = Result<Option<ScenarioResult>, ScenarioError>;

type StepFn = dyn for<'a> Fn(&'a mut ScenarioExecution) -> BoxFuture<'a, StepResult> + Send + Sync;

/// Content injected by a script instead of asking a participant.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptContent {
    Text(String),
    Message(ChatMessage),
}

impl ScriptContent {
    /// Plain text takes the message role of the slot it fills.
    pub fn into_message(self, role: AgentRole) -> ChatMessage {
        match self {
            ScriptContent::Text(text) => ChatMessage::new(role.message_role(), text),
            ScriptContent::Message(message) => message,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ScriptContent::Text(text) => text.clone(),
            ScriptContent::Message(message) => message.text().unwrap_or_default().to_string(),
        }
    }
}

impl From<&str> for ScriptContent {
    fn from(value: &str) -> Self {
        ScriptContent::Text(value.to_string())
    }
}

impl From<String> for ScriptContent {
    fn from(value: String) -> Self {
        ScriptContent::Text(value)
    }
}

impl From<ChatMessage> for ScriptContent {
    fn from(value: ChatMessage) -> Self {
        ScriptContent::Message(value)
    }
}

#[derive(Clone)]
pub struct ScriptStep {
    label: &'static str,
    run: Arc<StepFn>,
}

impl fmt::Debug for ScriptStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptStep").field("label", &self.label).finish()
    }
}

impl ScriptStep {
    pub fn custom<F>(label: &'static str, run: F) -> Self
    where
        F: for<'a> Fn(&'a mut ScenarioExecution) -> BoxFuture<'a, StepResult> + Send + Sync + 'static,
    {
        Self {
            label,
            run: Arc::new(run),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub async fn run(&self, execution: &mut ScenarioExecution) -> StepResult {
        (self.run)(execution).await
    }

    /// Appends a message. User and assistant messages fill the matching role's
    /// slot for the turn; any other role goes straight into history.
    pub fn message(message: ChatMessage) -> Self {
        Self::custom("message", move |execution: &mut ScenarioExecution| {
            let message = message.clone();
            async move { execution.message(message).await }.boxed()
        })
    }

    /// Lets the next pending user-role participant speak.
    pub fn user() -> Self {
        Self::custom("user", |execution: &mut ScenarioExecution| {
            async move { execution.user().await }.boxed()
        })
    }

    pub fn user_says(content: impl Into<ScriptContent>) -> Self {
        let content = content.into();
        Self::custom("user", move |execution: &mut ScenarioExecution| {
            let content = content.clone();
            async move { execution.user_says(content).await }.boxed()
        })
    }

    /// Lets the next pending agent-role participant speak.
    pub fn agent() -> Self {
        Self::custom("agent", |execution: &mut ScenarioExecution| {
            async move { execution.agent().await }.boxed()
        })
    }

    pub fn agent_says(content: impl Into<ScriptContent>) -> Self {
        let content = content.into();
        Self::custom("agent", move |execution: &mut ScenarioExecution| {
            let content = content.clone();
            async move { execution.agent_says(content).await }.boxed()
        })
    }

    /// Asks the judge for a verdict now.
    pub fn judge() -> Self {
        Self::custom("judge", |execution: &mut ScenarioExecution| {
            async move { execution.judge().await }.boxed()
        })
    }

    pub fn judge_says(content: impl Into<ScriptContent>) -> Self {
        let content = content.into();
        Self::custom("judge", move |execution: &mut ScenarioExecution| {
            let content = content.clone();
            async move { execution.judge_says(content).await }.boxed()
        })
    }

    /// Runs the simulation freely until a verdict or the turn limit.
    pub fn proceed() -> Self {
        Self::proceed_with(ProceedOptions::default())
    }

    pub fn proceed_for(turns: usize) -> Self {
        Self::proceed_with(ProceedOptions::default().turns(turns))
    }

    pub fn proceed_with(options: ProceedOptions) -> Self {
        Self::custom("proceed", move |execution: &mut ScenarioExecution| {
            let options = options.clone();
            async move { Ok(execution.proceed(options).await) }.boxed()
        })
    }

    pub fn succeed() -> Self {
        Self::custom("succeed", |execution: &mut ScenarioExecution| {
            async move { Ok(Some(execution.succeed())) }.boxed()
        })
    }

    pub fn succeed_with(reasoning: impl Into<String>) -> Self {
        let reasoning = reasoning.into();
        Self::custom("succeed", move |execution: &mut ScenarioExecution| {
            let reasoning = reasoning.clone();
            async move { Ok(Some(execution.succeed_with(reasoning))) }.boxed()
        })
    }

    pub fn fail() -> Self {
        Self::custom("fail", |execution: &mut ScenarioExecution| {
            async move { Ok(Some(execution.fail())) }.boxed()
        })
    }

    pub fn fail_with(reasoning: impl Into<String>) -> Self {
        let reasoning = reasoning.into();
        Self::custom("fail", move |execution: &mut ScenarioExecution| {
            let reasoning = reasoning.clone();
            async move { Ok(Some(execution.fail_with(reasoning))) }.boxed()
        })
    }
}
