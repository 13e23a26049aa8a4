//! Per-call instrumentation: in-flight gauge, event timing, span and baggage

use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::baggage::BaggageExt;
use opentelemetry::{Context, KeyValue};
use prompti_telemetry::MetricsSink;

use crate::types::TraceIds;

/// Holds one unit of the in-flight gauge until dropped
///
/// Dropping the guard also runs when the call task is aborted, so the gauge
/// cannot leak on cancellation.
pub struct InflightGuard {
    metrics: Arc<dyn MetricsSink>,
    provider: String,
}

impl InflightGuard {
    pub fn new(metrics: Arc<dyn MetricsSink>, provider: impl Into<String>) -> Self {
        let provider = provider.into();
        metrics.inflight(&provider, 1);
        Self { metrics, provider }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.metrics.inflight(&self.provider, -1);
    }
}

/// Measurement taken when an event is emitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Seconds from call start to the first event
    FirstToken(f64),
    /// Seconds since the previous event
    Gap(f64),
}

/// Clock for time to first token and inter-event gaps
#[derive(Debug, Clone, Copy)]
pub struct EventTimer {
    start: Instant,
    last: Option<Instant>,
}

impl EventTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            last: None,
        }
    }

    /// Record an emitted event
    pub fn tick(&mut self) -> Tick {
        let now = Instant::now();
        let tick = match self.last {
            None => Tick::FirstToken(now.duration_since(self.start).as_secs_f64()),
            Some(last) => Tick::Gap(now.duration_since(last).as_secs_f64()),
        };
        self.last = Some(now);
        tick
    }

    /// Time since the call started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Span covering one call including its retries
pub fn call_span(provider: &str, model: &str, trace: &TraceIds) -> tracing::Span {
    tracing::info_span!(
        "llm.call",
        provider = %provider,
        model = %model,
        request_id = trace.request_id.as_deref(),
        session_id = trace.session_id.as_deref(),
        user_id = trace.user_id.as_deref(),
    )
}

/// Current context extended with the call's identifiers as baggage
pub fn baggage_context(trace: &TraceIds) -> Context {
    let entries: Vec<KeyValue> = [
        ("request_id", &trace.request_id),
        ("session_id", &trace.session_id),
        ("user_id", &trace.user_id),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_ref().map(|value| KeyValue::new(key, value.clone())))
    .collect();

    Context::current_with_baggage(entries)
}
