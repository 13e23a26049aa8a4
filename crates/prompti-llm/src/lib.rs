//! Canonical chat-completion client for prompti
//!
//! Callers describe a call once with the provider-agnostic [`Request`] and
//! get a stream of [`StreamEvent`]s back, whether the configured vendor
//! speaks the `OpenAI` chat completion API, the Anthropic Messages API or
//! sits behind a routing gateway. Wire translation, SSE decoding, tool call
//! reassembly, transport retries and call telemetry happen in between.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod assembler;
pub mod client;
pub mod convert;
pub mod error;
pub mod instrument;
pub mod protocol;
pub mod provider;
pub mod retry;
pub mod stream;
pub mod types;

pub use client::{EventStream, ModelClient};
pub use error::LlmError;
pub use provider::{Provider, ProviderRegistry};
pub use retry::{RetryPolicy, with_retry};
pub use types::{
    Message, Part, Request, Role, StreamEvent, ToolChoice, ToolParams, ToolResult, ToolSpec, ToolUse, TraceIds,
    Usage, VendorError,
};
