use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool result
    Tool,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// One chat turn or event
///
/// Serializes as `{"role": .., "kind": .., "content": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Kind and payload
    #[serde(flatten)]
    pub part: Part,
}

/// Payload of a message, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Part {
    /// Plain text
    Text(String),
    /// Model reasoning
    Thinking(String),
    /// A tool invocation requested by the assistant
    ToolUse(ToolUse),
    /// The output of a tool invocation
    ToolResult(ToolResult),
    /// Image reference (URL or `data:` URI)
    ImageUrl(String),
    /// Non-image file reference
    File {
        /// Location of the file
        url: String,
        /// MIME type, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// Structured data for the caller, never sent to a vendor
    Data(Value),
    /// A failure reported by the vendor
    Error(String),
}

/// A finalized tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Call id referenced by the matching tool result
    pub id: String,
    /// Tool name
    pub name: String,
    /// Parsed arguments
    pub arguments: Value,
}

/// Result of executing a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the tool call this answers
    pub call_id: String,
    /// Tool output; non-string values are sent as JSON text
    pub content: Value,
    /// Whether the tool failed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Content as the string vendors expect
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Message {
    pub const fn new(role: Role, part: Part) -> Self {
        Self { role, part }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Part::Text(text.into()))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Part::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Part::Text(text.into()))
    }

    /// Assistant turn requesting a tool call
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self::new(
            Role::Assistant,
            Part::ToolUse(ToolUse {
                id: id.into(),
                name: name.into(),
                arguments,
            }),
        )
    }

    /// Tool turn answering the call `call_id`
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<Value>) -> Self {
        Self::new(
            Role::Tool,
            Part::ToolResult(ToolResult {
                call_id: call_id.into(),
                content: content.into(),
                is_error: false,
            }),
        )
    }

    /// Text of a text or thinking message
    pub fn text(&self) -> Option<&str> {
        match &self.part {
            Part::Text(text) | Part::Thinking(text) => Some(text),
            _ => None,
        }
    }

    /// Kind label as used on the wire
    pub const fn kind(&self) -> &'static str {
        match self.part {
            Part::Text(_) => "text",
            Part::Thinking(_) => "thinking",
            Part::ToolUse(_) => "tool_use",
            Part::ToolResult(_) => "tool_result",
            Part::ImageUrl(_) => "image_url",
            Part::File { .. } => "file",
            Part::Data(_) => "data",
            Part::Error(_) => "error",
        }
    }
}
