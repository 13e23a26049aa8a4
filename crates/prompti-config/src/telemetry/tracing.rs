use serde::Deserialize;

use super::exporters::ExporterConfig;

/// Tracing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingConfig {
    /// Sampling rate (0.0 to 1.0)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// Honour the sampling decision of a parent span
    #[serde(default = "default_true")]
    pub parent_based: bool,
    /// Exporter used for traces instead of the shared one
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
}

const fn default_sampling_rate() -> f64 {
    1.0
}

const fn default_true() -> bool {
    true
}
