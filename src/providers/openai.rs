use std::{env, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    config::ModelConfig,
    error::LLMError,
    functions::{Tool, ToolChoice},
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest, CompletionResponse, TokenUsage},
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Key and base URL from the project's model settings, falling back to
    /// `OPENAI_API_KEY` / `OPENAI_BASE_URL`.
    pub fn resolve(model: &ModelConfig) -> Result<Self, LLMError> {
        let api_key = model
            .api_key
            .clone()
            .or_else(|| env::var(API_KEY_VAR).ok())
            .ok_or(LLMError::MissingApiKey(API_KEY_VAR))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = model.base_url.clone().or_else(|| env::var("OPENAI_BASE_URL").ok()) {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

/// Any OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAI {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAI {
    pub fn from_config(config: OpenAIConfig) -> Result<Self, LLMError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_model_config(model: &ModelConfig) -> Result<Self, LLMError> {
        Self::from_config(OpenAIConfig::resolve(model)?)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [Tool],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

impl<'a> From<&'a CompletionRequest> for RequestBody<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: &request.tools,
            // Some compatible servers reject a tool choice without tools.
            tool_choice: request.tool_choice.filter(|_| !request.tools.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl LLMProvider for OpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        tracing::debug!(model = %request.model, messages = request.messages.len(), "chat completion");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&RequestBody::from(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("unexpected status {status}: {text}"));
            return Err(LLMError::Provider(message));
        }

        let body: ResponseBody = response.json().await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or(LLMError::InvalidResponse("response did not contain any choices"))?;

        Ok(CompletionResponse {
            message: choice.message,
            usage: body.usage,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionDefinition;

    #[test]
    fn completions_url_ignores_trailing_slash() {
        let provider =
            OpenAI::from_config(OpenAIConfig::new("key").with_base_url("http://localhost:8080/v1/"))
                .unwrap();
        assert_eq!(provider.completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn tool_choice_is_sent_only_with_tools() {
        let request = CompletionRequest::new("gpt-4.1-mini", vec![ChatMessage::user("hi")])
            .with_tool_choice(ToolChoice::Required);
        let value = serde_json::to_value(RequestBody::from(&request)).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());

        let request = request.with_tool(FunctionDefinition::new("finish_test").to_tool());
        let value = serde_json::to_value(RequestBody::from(&request)).unwrap();
        assert_eq!(value["tools"][0]["function"]["name"], "finish_test");
        assert_eq!(value["tool_choice"], "required");
    }

    #[test]
    fn model_config_key_takes_precedence() {
        let model = ModelConfig {
            model: "gpt-4.1-mini".into(),
            api_key: Some("from-file".into()),
            base_url: Some("http://localhost:1234/v1".into()),
            ..ModelConfig::default()
        };
        let config = OpenAIConfig::resolve(&model).unwrap();
        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.base_url, "http://localhost:1234/v1");
    }
}
