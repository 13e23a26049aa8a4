use serde::{Deserialize, Serialize};

use super::message::{Message, Part, Role, ToolUse};

/// One unit delivered to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Text delta (or the whole text of a non-streaming reply)
    Text(String),
    /// Reasoning delta
    Thinking(String),
    /// A finalized tool call
    ToolUse(ToolUse),
    /// The vendor reported a failure; always the last event of an attempt
    Error(VendorError),
    /// The previous attempt failed after emitting events and the call is
    /// starting over; everything received before this marker is void
    Reset {
        /// Number of the attempt about to start (2 for the first retry)
        attempt: u32,
    },
}

/// Failure reported by the vendor inside a successful exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorError {
    /// HTTP status of the response carrying the failure
    pub status: u16,
    /// Raw error body
    pub body: String,
}

impl StreamEvent {
    /// Canonical assistant message for this event; `None` for a reset marker
    pub fn into_message(self) -> Option<Message> {
        let part = match self {
            Self::Text(text) => Part::Text(text),
            Self::Thinking(text) => Part::Thinking(text),
            Self::ToolUse(call) => Part::ToolUse(call),
            Self::Error(error) => Part::Error(error.body),
            Self::Reset { .. } => return None,
        };

        Some(Message::new(Role::Assistant, part))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
