use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::Config;

/// Parse a human duration such as `"500ms"`, `"10s"` or `"2m"`
///
/// # Errors
///
/// Returns an error when the string is not a valid duration
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    duration_str::parse(s).map_err(|e| anyhow::anyhow!("invalid duration '{s}': {e}"))
}

/// Where a configuration document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Local file or caller-supplied text; `{{ env.VAR }}` is expanded
    Local,
    /// Fetched over the network; placeholders are left as written so a
    /// remote document cannot read the local environment
    Remote,
}

/// Text format of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Config {
    /// Load configuration from a file
    ///
    /// Files ending in `.json` are parsed as JSON, anything else as TOML.
    /// `{{ env.VAR }}` placeholders are expanded before parsing and the
    /// result is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, expansion or parsing
    /// fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        };

        Self::parse(&raw, format, Origin::Local)
    }

    /// Fetch a JSON configuration document over HTTP
    ///
    /// Unlike local files, `{{ env.VAR }}` placeholders in the document are
    /// not expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the body is not a valid configuration
    pub async fn fetch(url: &Url) -> anyhow::Result<Self> {
        tracing::debug!(url = %url, "fetching remote config");

        let response = reqwest::get(url.clone())
            .await
            .map_err(|e| anyhow::anyhow!("failed to fetch config from {url}: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("config server {url} returned {status}");
        }

        let raw = response
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("failed to read config body from {url}: {e}"))?;

        Self::parse(&raw, Format::Json, Origin::Remote)
    }

    /// Parse TOML configuration text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Self::parse(raw, Format::Toml, Origin::Local)
    }

    fn parse(raw: &str, format: Format, origin: Origin) -> anyhow::Result<Self> {
        let expanded = match origin {
            Origin::Local => crate::env::expand_env(raw)
                .map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?,
            Origin::Remote => raw.to_owned(),
        };

        let config: Self = match format {
            Format::Toml => toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?,
            Format::Json => {
                serde_json::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?
            }
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns an error if the model or retry sections are invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        self.model.validate()?;
        self.retry.validate()?;

        if let Some(tracing) = self.telemetry.as_ref().and_then(|t| t.tracing.as_ref())
            && !(0.0..=1.0).contains(&tracing.sampling_rate)
        {
            anyhow::bail!("telemetry.tracing.sampling_rate must be between 0.0 and 1.0");
        }

        Ok(())
    }
}
