//! Metric names and the OpenTelemetry-backed sink

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, UpDownCounter},
};

use crate::sink::MetricsSink;

pub const LLM_INFLIGHT_REQUESTS: &str = "llm_inflight_requests";
pub const LLM_FIRST_TOKEN_LATENCY: &str = "llm_first_token_latency_seconds";
pub const LLM_INTERTOKEN_GAP: &str = "llm_stream_intertoken_gap_seconds";
pub const LLM_REQUEST_LATENCY: &str = "llm_request_latency_seconds";
pub const LLM_REQUESTS_TOTAL: &str = "llm_requests_total";
pub const LLM_PROMPT_TOKENS: &str = "llm_prompt_tokens_total";
pub const LLM_COMPLETION_TOKENS: &str = "llm_completion_tokens_total";

/// Histogram buckets for time-to-first-token, in seconds
pub const FIRST_TOKEN_BUCKETS: [f64; 7] = [0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0];

/// Histogram buckets for the gap between streamed events, in seconds
pub const INTERTOKEN_BUCKETS: [f64; 8] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

/// Sink recording into instruments of the global meter provider
///
/// Instruments are created once; recording is safe from any task.
#[derive(Debug, Clone)]
pub struct OtelMetrics {
    inflight: UpDownCounter<i64>,
    first_token: Histogram<f64>,
    token_gap: Histogram<f64>,
    request_latency: Histogram<f64>,
    requests: Counter<u64>,
    prompt_tokens: Counter<u64>,
    completion_tokens: Counter<u64>,
}

impl OtelMetrics {
    pub fn new() -> Self {
        let meter = global::meter("prompti");

        Self {
            inflight: meter
                .i64_up_down_counter(LLM_INFLIGHT_REQUESTS)
                .with_description("Model calls currently in flight")
                .build(),
            first_token: meter
                .f64_histogram(LLM_FIRST_TOKEN_LATENCY)
                .with_description("Time from call start to the first streamed event")
                .with_unit("s")
                .with_boundaries(FIRST_TOKEN_BUCKETS.to_vec())
                .build(),
            token_gap: meter
                .f64_histogram(LLM_INTERTOKEN_GAP)
                .with_description("Gap between consecutive streamed events")
                .with_unit("s")
                .with_boundaries(INTERTOKEN_BUCKETS.to_vec())
                .build(),
            request_latency: meter
                .f64_histogram(LLM_REQUEST_LATENCY)
                .with_description("Total model call latency including retries")
                .with_unit("s")
                .build(),
            requests: meter
                .u64_counter(LLM_REQUESTS_TOTAL)
                .with_description("Finished model calls")
                .build(),
            prompt_tokens: meter
                .u64_counter(LLM_PROMPT_TOKENS)
                .with_description("Prompt tokens reported by vendors")
                .build(),
            completion_tokens: meter
                .u64_counter(LLM_COMPLETION_TOKENS)
                .with_description("Completion tokens reported by vendors")
                .build(),
        }
    }
}

impl Default for OtelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn provider_only(provider: &str) -> [KeyValue; 1] {
    [KeyValue::new("provider", provider.to_owned())]
}

fn provider_model(provider: &str, model: &str) -> [KeyValue; 2] {
    [
        KeyValue::new("provider", provider.to_owned()),
        KeyValue::new("model", model.to_owned()),
    ]
}

impl MetricsSink for OtelMetrics {
    fn inflight(&self, provider: &str, delta: i64) {
        self.inflight.add(delta, &provider_only(provider));
    }

    fn first_token(&self, provider: &str, model: &str, seconds: f64) {
        self.first_token.record(seconds, &provider_model(provider, model));
    }

    fn token_gap(&self, provider: &str, model: &str, seconds: f64) {
        self.token_gap.record(seconds, &provider_model(provider, model));
    }

    fn request_latency(&self, provider: &str, seconds: f64) {
        self.request_latency.record(seconds, &provider_only(provider));
    }

    fn request_finished(&self, provider: &str, result: &str, is_error: bool) {
        self.requests.add(
            1,
            &[
                KeyValue::new("provider", provider.to_owned()),
                KeyValue::new("result", result.to_owned()),
                KeyValue::new("is_error", if is_error { "true" } else { "false" }),
            ],
        );
    }

    fn usage(&self, provider: &str, model: &str, prompt_tokens: u64, completion_tokens: u64) {
        let attrs = provider_model(provider, model);
        self.prompt_tokens.add(prompt_tokens, &attrs);
        self.completion_tokens.add(completion_tokens, &attrs);
    }
}
