//! Metrics sink that records every call for assertions

use std::sync::Mutex;

use prompti_telemetry::MetricsSink;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Inflight { provider: String, delta: i64 },
    FirstToken { provider: String, model: String },
    TokenGap { provider: String, model: String },
    RequestLatency { provider: String },
    RequestFinished { provider: String, result: String, is_error: bool },
    Usage { provider: String, model: String, prompt: u64, completion: u64 },
}

#[derive(Debug, Default)]
pub struct RecordingMetrics {
    records: Mutex<Vec<Record>>,
}

impl RecordingMetrics {
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    /// Current value of the in-flight gauge
    pub fn inflight(&self) -> i64 {
        self.records()
            .iter()
            .map(|record| match record {
                Record::Inflight { delta, .. } => *delta,
                _ => 0,
            })
            .sum()
    }

    /// `(result, is_error)` of every finished call
    pub fn finished(&self) -> Vec<(String, bool)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                Record::RequestFinished { result, is_error, .. } => Some((result, is_error)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}

impl MetricsSink for RecordingMetrics {
    fn inflight(&self, provider: &str, delta: i64) {
        self.push(Record::Inflight {
            provider: provider.to_owned(),
            delta,
        });
    }

    fn first_token(&self, provider: &str, model: &str, _: f64) {
        self.push(Record::FirstToken {
            provider: provider.to_owned(),
            model: model.to_owned(),
        });
    }

    fn token_gap(&self, provider: &str, model: &str, _: f64) {
        self.push(Record::TokenGap {
            provider: provider.to_owned(),
            model: model.to_owned(),
        });
    }

    fn request_latency(&self, provider: &str, _: f64) {
        self.push(Record::RequestLatency {
            provider: provider.to_owned(),
        });
    }

    fn request_finished(&self, provider: &str, result: &str, is_error: bool) {
        self.push(Record::RequestFinished {
            provider: provider.to_owned(),
            result: result.to_owned(),
            is_error,
        });
    }

    fn usage(&self, provider: &str, model: &str, prompt_tokens: u64, completion_tokens: u64) {
        self.push(Record::Usage {
            provider: provider.to_owned(),
            model: model.to_owned(),
            prompt: prompt_tokens,
            completion: completion_tokens,
        });
    }
}
