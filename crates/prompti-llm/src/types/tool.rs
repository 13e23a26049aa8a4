use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, `^[A-Za-z_][A-Za-z0-9_]*$`
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the arguments
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Whether the name is a valid identifier
    pub fn has_valid_name(&self) -> bool {
        fn re() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("must be valid regex"))
        }

        re().is_match(&self.name)
    }
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Whether and how the model should call tools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Vendor default, usually "model decides"
    #[default]
    Auto,
    /// Never call tools
    None,
    /// Call at least one tool
    Required,
    /// Call the named tool
    Force(String),
}

/// Tools offered to the model and the policy for calling them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParams {
    /// Offered tools, in order
    pub tools: Vec<ToolSpec>,
    /// Invocation policy
    #[serde(default)]
    pub choice: ToolChoice,
    /// Whether the model may request several calls in one turn
    #[serde(default = "default_parallel")]
    pub parallel_allowed: bool,
    /// Upper bound on tool calls emitted for one response
    #[serde(default)]
    pub max_calls: Option<usize>,
}

const fn default_parallel() -> bool {
    true
}

impl ToolParams {
    pub fn new(tools: Vec<ToolSpec>) -> Self {
        Self {
            tools,
            choice: ToolChoice::Auto,
            parallel_allowed: true,
            max_calls: None,
        }
    }

    #[must_use]
    pub fn with_choice(mut self, choice: ToolChoice) -> Self {
        self.choice = choice;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn valid_tool_names() {
        for name in ["get_time", "_private", "Tool2"] {
            assert!(ToolSpec::new(name, "", json!({})).has_valid_name(), "{name}");
        }
    }

    #[test]
    fn invalid_tool_names() {
        for name in ["", "2fast", "get-time", "get time", "tool.call"] {
            assert!(!ToolSpec::new(name, "", json!({})).has_valid_name(), "{name}");
        }
    }

    #[test]
    fn force_choice_round_trips_as_tagged_name() {
        let choice: ToolChoice = serde_json::from_value(json!({"force": "get_time"})).unwrap();
        assert_eq!(choice, ToolChoice::Force("get_time".to_owned()));
        assert_eq!(serde_json::to_value(ToolChoice::Required).unwrap(), json!("required"));
    }

    #[test]
    fn params_defaults_allow_parallel_calls() {
        let params: ToolParams = serde_json::from_value(json!({"tools": [{"name": "get_time"}]})).unwrap();
        assert!(params.parallel_allowed);
        assert_eq!(params.choice, ToolChoice::Auto);
        assert_eq!(params.tools[0].parameters["type"], "object");
    }
}
