use thiserror::Error;

/// Errors returned by the model client
///
/// Vendor-reported failures (non-2xx answers, error frames inside a stream)
/// are not errors at this level; they arrive as
/// [`StreamEvent::Error`](crate::types::StreamEvent::Error).
#[derive(Debug, Error)]
pub enum LlmError {
    /// A required configuration value is absent
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// No adapter is registered under the configured provider id
    #[error("provider not found: {provider}")]
    ProviderNotFound { provider: String },

    /// Caller sent a malformed request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, timeout or body read failure talking to the vendor
    #[error("transport error: {0}")]
    Transport(String),

    /// `run` was called after `close`
    #[error("client is closed")]
    Closed,

    /// `run` was called outside a Tokio runtime
    #[error("no Tokio runtime to drive the call")]
    NoRuntime,

    /// The consumer dropped the event stream
    #[error("event stream receiver dropped")]
    Cancelled,

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Whether the retry wrapper should re-run the call
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        // Builder (including body serialization) and redirect failures
        // repeat identically on retry. Mid-body drops surface as decode
        // errors and stay retryable.
        if e.is_builder() || e.is_redirect() || e.is_status() {
            return Self::Internal(e.into());
        }

        // Keep the source chain; reqwest's top-level message rarely names the cause
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport(message)
    }
}
