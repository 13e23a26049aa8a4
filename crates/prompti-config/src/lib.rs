//! Configuration for the prompti model client
//!
//! A configuration file names one model endpoint (provider id, model,
//! credentials, default sampling), the retry budget and optional telemetry
//! export. Files are TOML or JSON and may reference environment variables
//! with `{{ env.VAR }}` placeholders.

#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
pub mod model;
pub mod retry;
pub mod telemetry;

use serde::Deserialize;

pub use loader::parse_duration;
pub use model::*;
pub use retry::*;
pub use telemetry::TelemetryConfig;

/// Top-level prompti configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model endpoint configuration
    pub model: ModelConfig,
    /// Retry budget for transport failures
    #[serde(default)]
    pub retry: RetryConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
