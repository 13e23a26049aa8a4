//! Anthropic Messages adapter

use prompti_config::ModelConfig;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use super::{Provider, base_url, join_url, sealed};
use crate::convert::anthropic::to_anthropic;
use crate::convert::finish_wire;
use crate::error::LlmError;
use crate::stream::ChunkDecoder;
use crate::stream::anthropic::AnthropicDecoder;
use crate::types::Request;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API, also registered as `claude`
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicProvider;

impl sealed::Sealed for AnthropicProvider {}

impl Provider for AnthropicProvider {
    fn id(&self) -> &'static str {
        "anthropic"
    }

    fn api_key_var(&self) -> &'static str {
        "ANTHROPIC_API_KEY"
    }

    fn endpoint(&self, config: &ModelConfig) -> Result<Url, LlmError> {
        join_url(&base_url(config, DEFAULT_BASE_URL)?, "messages")
    }

    fn prepare(&self, builder: RequestBuilder, api_key: Option<&SecretString>) -> RequestBuilder {
        let builder = builder.header("anthropic-version", ANTHROPIC_VERSION);

        match api_key {
            Some(key) => builder.header("x-api-key", key.expose_secret()),
            None => builder,
        }
    }

    fn to_wire(&self, request: &Request, config: &ModelConfig) -> Result<Value, LlmError> {
        finish_wire(&to_anthropic(request, config), &request.overrides)
    }

    fn decoder(&self) -> Box<dyn ChunkDecoder> {
        Box::new(AnthropicDecoder)
    }
}
