pub mod agents;
pub mod config;
pub mod error;
pub mod eval;
pub mod events;
pub mod execution;
pub mod functions;
pub mod history;
pub mod ids;
pub mod logging;
pub mod providers;
pub mod scenario;
pub mod script;
pub mod state;
pub mod types;
pub mod verdict;

pub use agents::{
    AgentAdapter, AgentError, AgentInput, AgentOutput, AgentRole, JudgeAgent, ProviderAgent,
    ScenarioInfo, ScriptedAgent, UserSimulatorAgent,
};
pub use config::{EventsConfig, ModelConfig, ProjectConfig};
pub use error::{LLMError, ScenarioError};
pub use events::{
    EventBus, EventReporter, HttpEventReporter, MemoryReporter, RunEmitter, RunIds, RunStatus,
    ScenarioEvent,
};
pub use execution::{ExecutionHook, ProceedOptions, ScenarioExecution, StepOutcome};
pub use functions::{
    FunctionCall, FunctionDefinition, FunctionParameter, FunctionParameters, Tool, ToolCall,
    ToolChoice,
};
pub use history::ConversationHistory;
pub use providers::{LLMProvider, OpenAI, OpenAIConfig, ScriptedProvider};
pub use scenario::{run, ScenarioConfig, ScenarioRunner, DEFAULT_MAX_TURNS};
pub use script::{ScriptContent, ScriptStep, StepResult};
pub use state::ExecutionState;
pub use types::{ChatMessage, CompletionRequest, CompletionResponse, MessageRole, TokenUsage};
pub use verdict::ScenarioResult;
