use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{
    agents::{
        complete_cancellable, prompts, AgentAdapter, AgentError, AgentInput, AgentOutput, AgentRole,
    },
    config::ModelConfig,
    functions::{FunctionCall, FunctionDefinition, FunctionParameter, Tool, ToolChoice},
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest},
    verdict::ScenarioResult,
};

pub const FINISH_TEST_TOOL: &str = "finish_test";

/// Watches the conversation and renders the verdict through the
/// `finish_test` tool.
pub struct JudgeAgent {
    name: String,
    criteria: Vec<String>,
    provider: Arc<dyn LLMProvider>,
    model: ModelConfig,
    roles: [AgentRole; 1],
}

#[derive(Debug, Deserialize)]
struct FinishTestArgs {
    #[serde(default)]
    criteria: Map<String, Value>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    verdict: Option<String>,
}

impl JudgeAgent {
    pub fn new<I, S>(criteria: I, provider: Arc<dyn LLMProvider>, model: ModelConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "judge".to_string(),
            criteria: criteria.into_iter().map(Into::into).collect(),
            provider,
            model,
            roles: [AgentRole::Judge],
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn finish_test_tool(&self) -> Tool {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for criterion in &self.criteria {
            let name = prompts::criterion_to_param_name(criterion);
            properties.insert(
                name.clone(),
                json!({ "enum": [true, false, "inconclusive"], "description": criterion }),
            );
            required.push(Value::String(name));
        }

        FunctionDefinition::new(FINISH_TEST_TOOL)
            .with_description("Complete the test with a final verdict")
            .with_parameter(
                FunctionParameter::new(
                    "criteria",
                    json!({
                        "type": "object",
                        "properties": properties,
                        "required": required,
                        "additionalProperties": false,
                    }),
                )
                .with_description("Strict verdict for each criterion"),
            )
            .with_parameter(
                FunctionParameter::new("reasoning", json!({ "type": "string" }))
                    .with_description("Explanation of what the final verdict should be"),
            )
            .with_parameter(
                FunctionParameter::new(
                    "verdict",
                    json!({ "type": "string", "enum": ["success", "failure", "inconclusive"] }),
                )
                .with_description("The final verdict of the test"),
            )
            .to_tool()
    }

    fn verdict_from_call(&self, call: &FunctionCall) -> ScenarioResult {
        let args = match serde_json::from_value::<FinishTestArgs>(call.arguments.clone()) {
            Ok(args) => args,
            Err(error) => {
                tracing::error!(judge = %self.name, %error, "failed to parse finish_test arguments");
                return ScenarioResult::failure("Failed to parse test results")
                    .with_failed_criteria(self.criteria.clone());
            }
        };

        let mut passed = Vec::new();
        let mut failed = Vec::new();
        for criterion in &self.criteria {
            match args.criteria.get(&prompts::criterion_to_param_name(criterion)) {
                Some(Value::Bool(true)) => passed.push(criterion.clone()),
                Some(Value::Bool(false)) => failed.push(criterion.clone()),
                _ => {}
            }
        }

        let verdict = args.verdict.as_deref().unwrap_or("inconclusive");
        let reasoning = args
            .reasoning
            .unwrap_or_else(|| "No reasoning provided".to_string());

        let result = if verdict == "success" {
            ScenarioResult::success(reasoning)
        } else {
            ScenarioResult::failure(reasoning)
        };
        result.with_passed_criteria(passed).with_failed_criteria(failed)
    }
}

#[async_trait]
impl AgentAdapter for JudgeAgent {
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
        let enforce = input.must_render_verdict || input.is_last_turn();

        if self.criteria.is_empty() {
            if input.must_render_verdict {
                return Ok(AgentOutput::Verdict(ScenarioResult::failure(
                    "JudgeAgent was called as a judge, but it has no criteria to judge against",
                )));
            }
            return Ok(AgentOutput::Messages(Vec::new()));
        }

        let mut messages = Vec::with_capacity(input.history.len() + 2);
        messages.push(ChatMessage::system(prompts::judge_prompt(
            &input.scenario.description,
            &self.criteria,
        )?));
        messages.extend(input.history.iter().cloned());
        if enforce {
            messages.push(ChatMessage::user(prompts::FINISH_TEST_PROMPT));
        }

        let mut request = CompletionRequest::new(self.model.model.clone(), messages)
            .with_temperature(self.model.temperature)
            .with_tool(self.finish_test_tool());
        if enforce {
            request = request.with_tool_choice(ToolChoice::Required);
        }
        if let Some(max_tokens) = self.model.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response =
            complete_cancellable(self.provider.as_ref(), request, &input.cancellation).await?;

        if let Some(call) = response
            .message
            .tool_calls
            .iter()
            .find(|call| call.function.name == FINISH_TEST_TOOL)
        {
            return Ok(AgentOutput::Verdict(self.verdict_from_call(&call.function)));
        }

        if enforce {
            return Err(AgentError::InvalidVerdict(
                "judge was asked for a verdict but did not call finish_test".to_string(),
            ));
        }

        // Not ready to judge yet; the judge stays silent.
        Ok(AgentOutput::Messages(Vec::new()))
    }
}
