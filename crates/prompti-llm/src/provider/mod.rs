//! Vendor adapters
//!
//! A [`Provider`] knows where a vendor lives, how it authenticates, how to
//! spell a canonical [`Request`] on its wire and which decoder reads its
//! answers. The set is closed; the client looks adapters up by id in a
//! [`ProviderRegistry`] built once at construction.

pub mod anthropic;
pub mod openai;
pub mod routed;

use std::collections::HashMap;
use std::sync::Arc;

use prompti_config::ModelConfig;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use routed::RoutedProvider;

use crate::error::LlmError;
use crate::stream::ChunkDecoder;
use crate::types::Request;

mod sealed {
    pub trait Sealed {}
}

/// Per-vendor translation and transport details
pub trait Provider: Send + Sync + sealed::Sealed {
    /// Registry id
    fn id(&self) -> &'static str;

    /// Environment variable consulted when the config carries no key
    fn api_key_var(&self) -> &'static str;

    /// URL the request body is posted to
    fn endpoint(&self, config: &ModelConfig) -> Result<Url, LlmError>;

    /// Credential for the call, if any
    ///
    /// An explicit key in the config wins over the environment. A missing
    /// key is not an error; local gateways run unauthenticated.
    fn api_key(&self, config: &ModelConfig) -> Option<SecretString> {
        if let Some(key) = &config.api_key {
            return Some(key.clone());
        }

        let var = config.api_key_var.as_deref().unwrap_or_else(|| self.api_key_var());
        std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from)
    }

    /// Attach authentication and vendor headers
    fn prepare(&self, builder: RequestBuilder, api_key: Option<&SecretString>) -> RequestBuilder {
        match api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    /// Wire body for `request`, caller overrides merged last
    fn to_wire(&self, request: &Request, config: &ModelConfig) -> Result<Value, LlmError>;

    /// Fresh decoder for one attempt
    fn decoder(&self) -> Box<dyn ChunkDecoder>;
}

/// Lookup table from provider id to adapter
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Every adapter shipped with the crate
    pub fn builtin() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
        };

        registry.register(Arc::new(OpenAiProvider::OPENAI));
        registry.register(Arc::new(OpenAiProvider::OPENROUTER));
        registry.register(Arc::new(OpenAiProvider::QIANFAN));
        registry.register(Arc::new(RoutedProvider));

        let anthropic: Arc<dyn Provider> = Arc::new(AnthropicProvider);
        registry.providers.insert("claude", Arc::clone(&anthropic));
        registry.register(anthropic);

        registry
    }

    fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.id(), provider);
    }

    /// Adapter registered under `id`, ignoring case and surrounding blanks
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id.trim().to_ascii_lowercase().as_str()).cloned()
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.providers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").field("providers", &self.ids()).finish()
    }
}

/// `{base}/{path}` with exactly one slash between them
fn join_url(base: &Url, path: &str) -> Result<Url, LlmError> {
    let joined = format!("{}/{path}", base.as_str().trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| LlmError::MissingConfig(format!("invalid endpoint '{joined}': {e}")))
}

/// Configured base URL, or the vendor default
fn base_url(config: &ModelConfig, default: &str) -> Result<Url, LlmError> {
    match &config.base_url {
        Some(url) => Ok(url.clone()),
        None => Url::parse(default).map_err(|e| anyhow::anyhow!("invalid default base URL '{default}': {e}").into()),
    }
}
