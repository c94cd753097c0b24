use async_trait::async_trait;

use crate::types::{CompletionRequest, CompletionResponse};
use crate::LLMError;

pub mod openai;
pub mod scripted;

pub use openai::{OpenAI, OpenAIConfig};
pub use scripted::ScriptedProvider;

/// Chat-completion backend used by the LLM-backed participants.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError>;

    fn name(&self) -> &'static str;
}
