//! Anthropic Messages API wire format

use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Request types --

/// Messages API request body
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    /// Required by the API
    pub max_tokens: u32,
    /// Top-level system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<AnthropicToolChoice>,
}

/// Message with content blocks; roles alternate `user` / `assistant`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnthropicMessage {
    pub role: &'static str,
    pub content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    Image {
        source: AnthropicSource,
    },
    /// PDF input
    Document {
        source: AnthropicSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// Image or document source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicSource {
    Url { url: String },
    Base64 { media_type: String, data: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// `{"type": "auto" | "any" | "tool" | "none", "name"?, "disable_parallel_tool_use"?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnthropicToolChoice {
    #[serde(rename = "type")]
    pub choice_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_parallel_tool_use: Option<bool>,
}

// -- Response types --

/// Non-streaming response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicResponse {
    pub content: Vec<AnthropicBlock>,
    pub usage: Option<AnthropicUsage>,
    pub stop_reason: Option<String>,
}

/// Content block in a response or a `content_block_start` event
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
    pub thinking: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub input: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// -- Streaming types --

/// One `data:` payload of a streaming response
///
/// Covers `message_start`, `content_block_start`, `content_block_delta`,
/// `content_block_stop`, `message_delta`, `message_stop`, `ping` and
/// `error`. Deltas may carry `text`, `thinking`, `partial_json` or a
/// complete `tool_use` fragment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub index: Option<u32>,
    pub message: Option<AnthropicStreamMessage>,
    pub content_block: Option<AnthropicBlock>,
    pub delta: Option<AnthropicStreamDelta>,
    pub usage: Option<AnthropicUsage>,
    pub error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicStreamMessage {
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicStreamDelta {
    pub text: Option<String>,
    pub thinking: Option<String>,
    pub partial_json: Option<String>,
    pub tool_use: Option<AnthropicBlock>,
    pub stop_reason: Option<String>,
}
