use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::{Message, Part};
use super::tool::ToolParams;
use crate::error::LlmError;

/// Canonical call parameters
///
/// Adapters only ever read a request; each call builds a fresh wire body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Conversation so far, oldest first
    pub messages: Vec<Message>,
    /// Tools offered to the model
    #[serde(default)]
    pub tool_params: Option<ToolParams>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Top-k sampling (Anthropic-style vendors only)
    #[serde(default)]
    pub top_k: Option<u32>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default)]
    pub stop: Vec<String>,
    /// Number of choices to generate
    #[serde(default)]
    pub n: Option<u32>,
    /// Sampling seed
    #[serde(default)]
    pub seed: Option<i64>,
    /// Token bias map
    #[serde(default)]
    pub logit_bias: Option<Map<String, Value>>,
    /// Response format type (e.g. `json_object`)
    #[serde(default)]
    pub response_format: Option<String>,
    /// Stream the response as it is generated
    #[serde(default = "default_stream")]
    pub stream: bool,
    /// Identifiers used only for telemetry
    #[serde(default)]
    pub trace: TraceIds,
    /// Vendor fields merged into the wire body last, unchecked
    #[serde(default)]
    pub overrides: Map<String, Value>,
}

/// Request, session and user identifiers attached to spans and baggage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceIds {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

const fn default_stream() -> bool {
    true
}

impl Request {
    /// Streaming request over `messages` with no tools and vendor defaults
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tool_params: None,
            temperature: None,
            top_p: None,
            top_k: None,
            max_tokens: None,
            stop: Vec::new(),
            n: None,
            seed: None,
            logit_bias: None,
            response_format: None,
            stream: true,
            trace: TraceIds::default(),
            overrides: Map::new(),
        }
    }

    #[must_use]
    pub const fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tool_params: ToolParams) -> Self {
        self.tool_params = Some(tool_params);
        self
    }

    /// Check structural invariants before anything is sent
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` when the history is empty, a tool
    /// call has no id, a tool result answers an unknown call, or a tool name
    /// is invalid or repeated
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.messages.is_empty() {
            return Err(LlmError::InvalidRequest("request has no messages".to_owned()));
        }

        let mut call_ids = HashSet::new();
        for message in &self.messages {
            match &message.part {
                Part::ToolUse(call) => {
                    if call.id.is_empty() {
                        return Err(LlmError::InvalidRequest(format!(
                            "tool call to '{}' has no id",
                            call.name
                        )));
                    }
                    call_ids.insert(call.id.as_str());
                }
                Part::ToolResult(result) if !call_ids.contains(result.call_id.as_str()) => {
                    return Err(LlmError::InvalidRequest(format!(
                        "tool result references unknown call '{}'",
                        result.call_id
                    )));
                }
                _ => {}
            }
        }

        if let Some(params) = &self.tool_params {
            let mut names = HashSet::new();
            for tool in &params.tools {
                if !tool.has_valid_name() {
                    return Err(LlmError::InvalidRequest(format!("invalid tool name '{}'", tool.name)));
                }
                if !names.insert(tool.name.as_str()) {
                    return Err(LlmError::InvalidRequest(format!("duplicate tool name '{}'", tool.name)));
                }
            }
        }

        Ok(())
    }
}
