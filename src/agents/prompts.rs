use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::types::{ChatMessage, MessageRole};

const USER_SIMULATOR_TEMPLATE: &str = r#"<role>
You are pretending to be a user, testing an AI Agent based on a scenario.
Approach this naturally, as a human user would, with very short inputs, few words, all lowercase, imperative, no periods, like when they google or talk to chatgpt.
</role>

<goal>
Your goal is to interact with the Agent Under Test as if you were a human user to see if it can complete the scenario successfully.
</goal>

<scenario>
{{description}}
</scenario>

<rules>
1. DO NOT carry out requests yourself, YOU ARE NOT the assistant today
2. Keep the conversation going until the scenario goals have been explored
</rules>"#;

const JUDGE_TEMPLATE: &str = r#"<role>
You are an LLM as a judge watching a simulated conversation as it plays out live to determine if the agent under test meets the criteria or not.
</role>

<goal>
Your goal is to determine if you already have enough information to make a verdict of the scenario below, or if the conversation should continue for longer.
If you do have enough information, use the finish_test tool to determine if all the criteria have been met, if not, return a short "continue" message.
</goal>

<scenario>
{{description}}
</scenario>

<criteria>
{{#each criteria}}
{{this}}
{{/each}}
</criteria>

<rules>
- Be strict, do not let the conversation continue if the agent already broke one of the "do not" or "should not" criteria.
- DO NOT make any judgment calls that are not explicitly listed in the success or failure criteria, withhold judgement if necessary
</rules>"#;

pub const FINISH_TEST_PROMPT: &str = "System:\n\n<finish_test>\nThis is the last message, conversation has reached the maximum number of turns, give your final verdict.\nIf you don't have enough information to make a verdict, say inconclusive with max turns reached.\n</finish_test>";

static HANDLEBARS: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb
});

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

const MAX_PARAM_NAME_LEN: usize = 70;

#[derive(Serialize)]
struct PromptData<'a> {
    description: &'a str,
    criteria: Vec<String>,
}

pub fn user_simulator_prompt(description: &str) -> Result<String, handlebars::RenderError> {
    render(USER_SIMULATOR_TEMPLATE, description, &[])
}

pub fn judge_prompt(description: &str, criteria: &[String]) -> Result<String, handlebars::RenderError> {
    render(JUDGE_TEMPLATE, description, criteria)
}

fn render(
    template: &str,
    description: &str,
    criteria: &[String],
) -> Result<String, handlebars::RenderError> {
    let data = PromptData {
        description: if description.trim().is_empty() {
            "No scenario description"
        } else {
            description
        },
        criteria: criteria
            .iter()
            .enumerate()
            .map(|(idx, criterion)| format!("{}. {criterion}", idx + 1))
            .collect(),
    };

    HANDLEBARS.render_template(template, &data)
}

/// Tool parameter name for a natural-language criterion.
pub fn criterion_to_param_name(criterion: &str) -> String {
    let lowered = criterion.to_lowercase();
    let mut name = NON_ALPHANUMERIC
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string();
    name.truncate(MAX_PARAM_NAME_LEN);
    name
}

/// Swaps user and assistant so a model can play the user while still
/// answering as the assistant. Tool traffic belongs to the agent under test
/// and is dropped.
pub fn reverse_roles(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|message| !message.is_tool_traffic())
        .map(|message| {
            let mut reversed = message.clone();
            reversed.role = match message.role {
                MessageRole::User => MessageRole::Assistant,
                MessageRole::Assistant => MessageRole::User,
                other => other,
            };
            reversed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{FunctionCall, ToolCall};

    #[test]
    fn param_names_are_snake_case_and_bounded() {
        assert_eq!(
            criterion_to_param_name("Recipe should be vegetarian, not include meat!"),
            "recipe_should_be_vegetarian_not_include_meat"
        );
        let long = "word ".repeat(40);
        assert!(criterion_to_param_name(&long).len() <= MAX_PARAM_NAME_LEN);
    }

    #[test]
    fn judge_prompt_numbers_criteria_without_escaping() {
        let prompt = judge_prompt(
            "User asks for a \"quick\" dinner",
            &["Agent asks <= 1 question".to_string(), "Recipe is vegetarian".to_string()],
        )
        .unwrap();
        assert!(prompt.contains("1. Agent asks <= 1 question"));
        assert!(prompt.contains("2. Recipe is vegetarian"));
        assert!(prompt.contains("\"quick\""));
    }

    #[test]
    fn empty_description_gets_placeholder() {
        let prompt = user_simulator_prompt("  ").unwrap();
        assert!(prompt.contains("No scenario description"));
    }

    #[test]
    fn reversal_swaps_roles_and_drops_tool_traffic() {
        let call = ToolCall::new(FunctionCall::new("search", serde_json::json!({})));
        let messages = vec![
            ChatMessage::system("rules"),
            ChatMessage::user("hi"),
            ChatMessage::assistant(String::new()).with_tool_calls(vec![call]),
            ChatMessage::tool("call_1", "result"),
            ChatMessage::assistant("hello"),
        ];

        let reversed = reverse_roles(&messages);
        let roles: Vec<MessageRole> = reversed.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::Assistant, MessageRole::User]
        );
    }
}
