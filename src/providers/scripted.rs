use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;

use crate::{
    functions::{FunctionCall, ToolCall},
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest, CompletionResponse},
    LLMError,
};

/// Provider that hands back canned completions in order and keeps every
/// request it receives, so LLM-backed participants can run offline.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatMessage>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.push(ChatMessage::assistant(content))
    }

    /// Queues an assistant message carrying a single tool call.
    pub fn with_tool_call(self, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        let call = ToolCall::new(FunctionCall::new(name, arguments)).with_id("call_scripted");
        let mut message = ChatMessage::assistant(String::new()).with_tool_calls(vec![call]);
        message.content = None;
        self.push(message)
    }

    fn push(self, message: ChatMessage) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(message);
        }
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .responses
            .lock()
            .map_err(|_| LLMError::Provider("scripted responses poisoned".to_string()))?
            .pop_front();

        match next {
            Some(message) => Ok(CompletionResponse {
                message,
                usage: None,
            }),
            None => Err(LLMError::Provider("no more scripted responses".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
