use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    agents::{
        complete_cancellable, prompts, AgentAdapter, AgentError, AgentInput, AgentOutput, AgentRole,
    },
    config::ModelConfig,
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest},
};

const OPENING_LINE: &str = "Hello, how can I help you today?";

/// Plays the user side of the conversation with a language model.
pub struct UserSimulatorAgent {
    name: String,
    provider: Arc<dyn LLMProvider>,
    model: ModelConfig,
    system_prompt: Option<String>,
    roles: [AgentRole; 1],
}

impl UserSimulatorAgent {
    pub fn new(provider: Arc<dyn LLMProvider>, model: ModelConfig) -> Self {
        Self {
            name: "user-simulator".to_string(),
            provider,
            model,
            system_prompt: None,
            roles: [AgentRole::User],
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the generated system prompt entirely.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn build_messages(&self, input: &AgentInput) -> Result<Vec<ChatMessage>, AgentError> {
        let system_prompt = match &self.system_prompt {
            Some(prompt) => prompt.clone(),
            None => prompts::user_simulator_prompt(&input.scenario.description)?,
        };

        let mut messages = Vec::with_capacity(input.history.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.push(ChatMessage::assistant(OPENING_LINE));
        messages.extend(input.history.iter().cloned());

        Ok(prompts::reverse_roles(&messages))
    }
}

#[async_trait]
impl AgentAdapter for UserSimulatorAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn roles(&self) -> &[AgentRole] {
        &self.roles
    }

    async fn call(&self, input: AgentInput) -> Result<AgentOutput, AgentError> {
        let mut request = CompletionRequest::new(self.model.model.clone(), self.build_messages(&input)?)
            .with_temperature(self.model.temperature);
        if let Some(max_tokens) = self.model.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response =
            complete_cancellable(self.provider.as_ref(), request, &input.cancellation).await?;

        match response.message.text().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(AgentOutput::Message(ChatMessage::user(text))),
            _ => Err(AgentError::EmptyResponse),
        }
    }
}
