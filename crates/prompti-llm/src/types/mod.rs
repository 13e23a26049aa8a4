//! Canonical, provider-agnostic types
//!
//! Callers build a [`Request`] from these and receive [`StreamEvent`]s back,
//! whichever vendor answers the call.

pub mod event;
pub mod message;
pub mod request;
pub mod tool;
pub mod usage;

pub use event::{StreamEvent, VendorError};
pub use message::{Message, Part, Role, ToolResult, ToolUse};
pub use request::{Request, TraceIds};
pub use tool::{ToolChoice, ToolParams, ToolSpec};
pub use usage::Usage;
