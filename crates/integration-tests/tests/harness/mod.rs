#![allow(dead_code)]

pub mod metrics;
pub mod mock_vendor;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use prompti_config::ModelConfig;
use prompti_llm::{EventStream, LlmError, ModelClient, RetryPolicy, StreamEvent};
use url::Url;

use self::metrics::RecordingMetrics;

/// Retry policy with millisecond delays
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        ..RetryPolicy::default()
    }
}

/// Client for `provider`/`model` pointed at `base_url`, with a recording sink
pub fn client(provider: &str, model: &str, base_url: Url) -> (ModelClient, Arc<RecordingMetrics>) {
    let metrics = Arc::new(RecordingMetrics::default());
    let config = ModelConfig::new(provider, model)
        .with_api_key("sk-test")
        .with_base_url(base_url);

    let client = ModelClient::new(config, metrics.clone())
        .unwrap()
        .with_retry_policy(fast_retry());

    (client, metrics)
}

/// Drain a stream into its items
pub async fn collect(stream: EventStream) -> Vec<Result<StreamEvent, LlmError>> {
    stream.collect().await
}

/// Drain a stream that must not fail
pub async fn events(stream: EventStream) -> Vec<StreamEvent> {
    collect(stream)
        .await
        .into_iter()
        .map(|item| item.expect("stream yielded an error"))
        .collect()
}

/// Concatenated text deltas
pub fn text_of(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
