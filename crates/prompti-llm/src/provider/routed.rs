//! Adapter for a multi-vendor routing gateway (`LiteLLM`)
//!
//! The gateway speaks the chat completion contract and picks the upstream
//! vendor from the model name, which is passed through verbatim
//! (e.g. `anthropic/claude-3-haiku`).

use prompti_config::ModelConfig;
use serde_json::Value;
use url::Url;

use super::{OpenAiProvider, Provider, join_url, sealed};
use crate::error::LlmError;
use crate::stream::ChunkDecoder;
use crate::stream::openai::OpenAiDecoder;
use crate::types::Request;

/// Environment variable naming the gateway when the config has no base URL
pub const ENDPOINT_VAR: &str = "LITELLM_ENDPOINT";

const COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Debug, Clone, Copy, Default)]
pub struct RoutedProvider;

impl sealed::Sealed for RoutedProvider {}

impl Provider for RoutedProvider {
    fn id(&self) -> &'static str {
        "litellm"
    }

    fn api_key_var(&self) -> &'static str {
        "LITELLM_API_KEY"
    }

    /// Accepts either the gateway root or its full completions URL
    fn endpoint(&self, config: &ModelConfig) -> Result<Url, LlmError> {
        let base = match &config.base_url {
            Some(url) => url.clone(),
            None => {
                let raw = std::env::var(ENDPOINT_VAR)
                    .ok()
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| {
                        LlmError::MissingConfig(format!("routed provider needs model.base_url or {ENDPOINT_VAR}"))
                    })?;
                Url::parse(raw.trim()).map_err(|e| LlmError::MissingConfig(format!("invalid {ENDPOINT_VAR}: {e}")))?
            }
        };

        if base.path().trim_end_matches('/').ends_with(COMPLETIONS_PATH) {
            return Ok(base);
        }

        join_url(&base, COMPLETIONS_PATH)
    }

    fn to_wire(&self, request: &Request, config: &ModelConfig) -> Result<Value, LlmError> {
        OpenAiProvider::wire(request, config, true)
    }

    fn decoder(&self) -> Box<dyn ChunkDecoder> {
        Box::new(OpenAiDecoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn endpoint_from_environment() {
        let config = ModelConfig::new("litellm", "anthropic/claude-3-haiku");

        temp_env::with_var(ENDPOINT_VAR, Some("http://gateway.internal:4000"), || {
            assert_eq!(
                RoutedProvider.endpoint(&config).unwrap().as_str(),
                "http://gateway.internal:4000/chat/completions"
            );
        });
    }

    #[test]
    fn full_completions_url_is_kept() {
        let config = ModelConfig::new("litellm", "gpt-4o")
            .with_base_url(Url::parse("http://localhost:4000/v1/chat/completions").unwrap());

        assert_eq!(
            RoutedProvider.endpoint(&config).unwrap().as_str(),
            "http://localhost:4000/v1/chat/completions"
        );
    }

    #[test]
    fn missing_endpoint_is_config_error() {
        let config = ModelConfig::new("litellm", "gpt-4o");

        temp_env::with_var_unset(ENDPOINT_VAR, || {
            let err = RoutedProvider.endpoint(&config).unwrap_err();
            assert!(matches!(err, LlmError::MissingConfig(message) if message.contains(ENDPOINT_VAR)));
        });
    }

    #[test]
    fn model_name_is_passed_through() {
        let request = Request::new(vec![Message::user("hi")]);
        let body = RoutedProvider
            .to_wire(&request, &ModelConfig::new("litellm", "anthropic/claude-3-haiku"))
            .unwrap();

        assert_eq!(body["model"], "anthropic/claude-3-haiku");
        assert_eq!(body["messages"][0]["content"], "hi");
    }
}
