use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for the model endpoint a client talks to
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Provider id used to select the adapter (e.g. `openai`, `anthropic`, `litellm`)
    #[serde(default)]
    pub provider: String,
    /// Model name sent to the vendor
    #[serde(default)]
    pub model: String,
    /// API key, takes precedence over the environment
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Environment variable holding the API key, replaces the provider default
    #[serde(default)]
    pub api_key_var: Option<String>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Default temperature when the request sets none
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Default nucleus sampling when the request sets none
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Default output token limit when the request sets none
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Connect timeout (e.g. "5s")
    #[serde(default)]
    pub connect_timeout: Option<String>,
    /// Longest silence tolerated between two reads from the vendor (e.g.
    /// "30s"); a stream that keeps sending may run for any length of time
    #[serde(default)]
    pub read_timeout: Option<String>,
}

impl ModelConfig {
    /// Config for `model` served by `provider`, everything else unset
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Check the fields every call needs
    ///
    /// # Errors
    ///
    /// Returns an error when the provider or model is blank or a timeout
    /// cannot be parsed
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provider.trim().is_empty() {
            anyhow::bail!("model.provider must be set");
        }

        if self.model.trim().is_empty() {
            anyhow::bail!("model.model must be set");
        }

        for timeout in [&self.connect_timeout, &self.read_timeout].into_iter().flatten() {
            crate::parse_duration(timeout)?;
        }

        Ok(())
    }
}
