//! Tool definitions and tool calls in the OpenAI chat-completions wire format.
//! The judge is the only participant that offers a tool (`finish_test`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: FunctionParameters,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: FunctionParameters::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameter(mut self, parameter: FunctionParameter) -> Self {
        let mut schema = parameter.schema;
        if let (Some(description), Some(object)) = (parameter.description, schema.as_object_mut()) {
            object.insert("description".into(), Value::String(description));
        }
        if parameter.required {
            self.parameters.required.push(parameter.name.clone());
        }
        self.parameters.properties.insert(parameter.name, schema);
        self
    }

    pub fn to_tool(&self) -> Tool {
        Tool::from(self.clone())
    }
}

/// JSON schema object describing a function's arguments. Closed to extra
/// properties so strict models fill in exactly what is declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParameters {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: bool,
}

impl Default for FunctionParameters {
    fn default() -> Self {
        Self {
            kind: "object".into(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionParameter {
    pub name: String,
    pub schema: Value,
    pub description: Option<String>,
    pub required: bool,
}

impl FunctionParameter {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            description: None,
            required: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    kind: String,
    pub function: FunctionDefinition,
}

impl From<FunctionDefinition> for Tool {
    fn from(function: FunctionDefinition) -> Self {
        Self {
            kind: "function".into(),
            function,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
    /// The model must call one of the offered tools.
    Required,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// `Value::Null` when the model sent arguments that are not valid JSON.
    pub arguments: Value,
    pub raw_arguments: Option<String>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            raw_arguments: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireToolCall", try_from = "WireToolCall")]
pub struct ToolCall {
    pub id: Option<String>,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(function: FunctionCall) -> Self {
        Self { id: None, function }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// On the wire, arguments travel as a JSON-encoded string.
#[derive(Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".into()
}

impl From<ToolCall> for WireToolCall {
    fn from(call: ToolCall) -> Self {
        let arguments = call
            .function
            .raw_arguments
            .unwrap_or_else(|| call.function.arguments.to_string());
        Self {
            id: call.id,
            kind: function_kind(),
            function: WireFunctionCall {
                name: call.function.name,
                arguments,
            },
        }
    }
}

impl TryFrom<WireToolCall> for ToolCall {
    type Error = String;

    fn try_from(wire: WireToolCall) -> Result<Self, Self::Error> {
        if wire.kind != "function" {
            return Err(format!("unsupported tool call type '{}'", wire.kind));
        }

        let raw = wire.function.arguments;
        let arguments = if raw.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&raw).unwrap_or(Value::Null)
        };

        Ok(Self {
            id: wire.id,
            function: FunctionCall {
                name: wire.function.name,
                arguments,
                raw_arguments: Some(raw),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tool_call_arguments_serialize_as_string() {
        let call = ToolCall::new(FunctionCall::new("finish_test", json!({ "verdict": "success" })))
            .with_id("call_1");
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["arguments"], "{\"verdict\":\"success\"}");
    }

    #[test]
    fn tool_call_keeps_malformed_arguments_raw() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "call_1",
            "type": "function",
            "function": { "name": "finish_test", "arguments": "{not json" }
        }))
        .unwrap();
        assert_eq!(call.function.arguments, Value::Null);
        assert_eq!(call.function.raw_arguments.as_deref(), Some("{not json"));
    }

    #[test]
    fn non_function_tool_calls_are_rejected() {
        let raw = json!({ "type": "retrieval", "function": { "name": "x" } });
        assert!(serde_json::from_value::<ToolCall>(raw).is_err());
    }

    #[test]
    fn required_parameters_are_listed() {
        let definition = FunctionDefinition::new("finish_test")
            .with_parameter(FunctionParameter::new("reasoning", json!({ "type": "string" })))
            .with_parameter(FunctionParameter::new("note", json!({ "type": "string" })).optional());
        assert_eq!(definition.parameters.required, vec!["reasoning".to_string()]);
        assert_eq!(definition.parameters.properties.len(), 2);

        let tool = serde_json::to_value(definition.to_tool()).unwrap();
        assert_eq!(tool["function"]["parameters"]["additionalProperties"], false);
        assert_eq!(serde_json::to_value(ToolChoice::Required).unwrap(), "required");
    }
}
