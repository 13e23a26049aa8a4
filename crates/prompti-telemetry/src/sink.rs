//! Metrics emission interface
//!
//! The model client never touches a global registry directly. It is handed
//! an `Arc<dyn MetricsSink>` at construction and reports every measurement
//! through it, so callers choose between OpenTelemetry, a test recorder or
//! nothing at all.

/// Receiver for model call measurements
///
/// Implementations must be cheap and safe to call from many concurrent
/// calls.
pub trait MetricsSink: Send + Sync {
    /// Adjust the number of in-flight calls for `provider` by `delta`
    fn inflight(&self, provider: &str, delta: i64);

    /// Time from call start to the first emitted event
    fn first_token(&self, provider: &str, model: &str, seconds: f64);

    /// Gap between two consecutive emitted events
    fn token_gap(&self, provider: &str, model: &str, seconds: f64);

    /// Total wall time of a call including retries
    fn request_latency(&self, provider: &str, seconds: f64);

    /// A call finished; `result` is `success`, `vendor_error`, `transport_error`
    /// or `cancelled`
    fn request_finished(&self, provider: &str, result: &str, is_error: bool);

    /// Token usage reported by the vendor for one attempt
    fn usage(&self, provider: &str, model: &str, prompt_tokens: u64, completion_tokens: u64);
}

/// Sink that drops every measurement
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn inflight(&self, _: &str, _: i64) {}

    fn first_token(&self, _: &str, _: &str, _: f64) {}

    fn token_gap(&self, _: &str, _: &str, _: f64) {}

    fn request_latency(&self, _: &str, _: f64) {}

    fn request_finished(&self, _: &str, _: &str, _: bool) {}

    fn usage(&self, _: &str, _: &str, _: u64, _: u64) {}
}
