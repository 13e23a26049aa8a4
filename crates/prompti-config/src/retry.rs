use serde::Deserialize;

/// Retry budget for transport failures
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt (e.g. "500ms")
    #[serde(default = "default_initial_delay")]
    pub initial_delay: String,
    /// Upper bound for a single delay
    #[serde(default = "default_max_delay")]
    pub max_delay: String,
    /// Growth factor between consecutive delays
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Fraction of each delay added as random jitter (0.0 to 1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// # Errors
    ///
    /// Returns an error for a zero attempt budget, unparseable delays or
    /// out-of-range factors
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        crate::parse_duration(&self.initial_delay)?;
        crate::parse_duration(&self.max_delay)?;

        if self.multiplier < 1.0 {
            anyhow::bail!("retry.multiplier must be >= 1.0");
        }

        if !(0.0..=1.0).contains(&self.jitter) {
            anyhow::bail!("retry.jitter must be between 0.0 and 1.0");
        }

        Ok(())
    }
}

const fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> String {
    "500ms".to_string()
}

fn default_max_delay() -> String {
    "8s".to_string()
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_jitter() -> f64 {
    0.5
}
