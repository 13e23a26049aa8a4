//! `OpenAI` chat completion wire format

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// -- Request types --

/// Chat completion request body
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpenAiRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OpenAiMessage>,
    /// Whether to stream the response
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<OpenAiStreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Replaces `max_tokens` for reasoning models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<OpenAiResponseFormat>,
    /// End-user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiTool>>,
    /// `"none"`, `"required"` or a forced function object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiStreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

/// Message within a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAiMessage {
    /// `system`, `user`, `assistant` or `tool`
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<OpenAiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
    /// Call answered by a `tool` message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Plain text or structured parts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAiImageUrl {
    pub url: String,
}

/// Tool definition
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiTool {
    /// Always `function`
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: OpenAiFunction,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiFunction {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments
    pub parameters: Value,
}

/// Tool call, in requests and in complete responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    #[serde(default)]
    pub function: OpenAiFunctionCall,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiFunctionCall {
    #[serde(default)]
    pub name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: String,
}

fn function_type() -> String {
    "function".to_owned()
}

// -- Response types --

/// Non-streaming chat completion response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiResponse {
    pub choices: Vec<OpenAiChoice>,
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiChoice {
    pub message: OpenAiChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiChoiceMessage {
    pub content: Option<String>,
    /// Reasoning text emitted by some compatible vendors
    pub reasoning_content: Option<String>,
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
    /// Single call in the pre-`tool_calls` shape
    pub function_call: Option<OpenAiFunctionCall>,
}

/// Token usage; field names vary between compatible vendors
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiUsage {
    #[serde(alias = "input_tokens", alias = "prompt_token")]
    pub prompt_tokens: u64,
    #[serde(alias = "output_tokens")]
    pub completion_tokens: u64,
}

// -- Streaming types --

/// One `data:` payload of a streaming response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiStreamChunk {
    pub choices: Vec<OpenAiStreamChoice>,
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiStreamChoice {
    pub index: u32,
    pub delta: OpenAiStreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiStreamDelta {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
    pub tool_calls: Option<Vec<OpenAiStreamToolCall>>,
    /// Fragment of a call in the pre-`tool_calls` shape
    pub function_call: Option<OpenAiStreamFunctionCall>,
}

/// Tool call fragment keyed by `index`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiStreamToolCall {
    pub index: Option<u32>,
    pub id: Option<String>,
    pub function: Option<OpenAiStreamFunctionCall>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiStreamFunctionCall {
    pub name: Option<String>,
    pub arguments: Option<String>,
}
