use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    agents::{complete_cancellable, AgentAdapter, AgentError, AgentInput, AgentOutput, AgentRole},
    config::ModelConfig,
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest},
};

/// Agent under test backed by a chat-completion provider: its instructions as
/// the system prompt, followed by the shared history.
#[derive(Clone)]
pub struct ProviderAgent {
    name: String,
    instructions: String,
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    roles: [AgentRole; 1],
}

impl fmt::Debug for ProviderAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAgent")
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderAgent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            roles: [AgentRole::Agent],
        }
    }

    pub fn from_model_config(
        name: impl Into<String>,
        instructions: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        model: &ModelConfig,
    ) -> Self {
        let mut agent = Self::new(name, instructions, provider, model.model.clone())
            .with_temperature(model.temperature);
        agent.max_tokens = model.max_tokens;
        agent
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

#[async_trait]
impl AgentAdapter for ProviderAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn roles(&self) -> &[AgentRole] {
        &self.roles
    }

    async fn call(&self, input: AgentInput) -> Result<AgentOutput, AgentError> {
        let mut messages = Vec::with_capacity(input.history.len() + 1);
        messages.push(ChatMessage::system(self.instructions.clone()));
        messages.extend(input.history.iter().cloned());

        let mut request = CompletionRequest::new(self.model.clone(), messages);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response =
            complete_cancellable(self.provider.as_ref(), request, &input.cancellation).await?;
        let message = response.message;

        if !message.tool_calls.is_empty() {
            return Ok(AgentOutput::Message(message));
        }

        match message.text().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(AgentOutput::Text(text.to_string())),
            _ => Err(AgentError::EmptyResponse),
        }
    }
}
