//! `OpenAI` chat completion adapter and its compatible presets

use prompti_config::ModelConfig;
use serde_json::Value;
use url::Url;

use super::{Provider, base_url, join_url, sealed};
use crate::convert::finish_wire;
use crate::convert::openai::to_openai;
use crate::error::LlmError;
use crate::stream::ChunkDecoder;
use crate::stream::openai::OpenAiDecoder;
use crate::types::Request;

/// Vendor speaking the chat completion contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenAiProvider {
    id: &'static str,
    default_base_url: &'static str,
    api_key_var: &'static str,
    /// Whether streams ask for a trailing usage chunk
    include_usage: bool,
}

impl OpenAiProvider {
    pub const OPENAI: Self = Self {
        id: "openai",
        default_base_url: "https://api.openai.com/v1",
        api_key_var: "OPENAI_API_KEY",
        include_usage: true,
    };

    pub const OPENROUTER: Self = Self {
        id: "openrouter",
        default_base_url: "https://openrouter.ai/api/v1",
        api_key_var: "OPENROUTER_API_KEY",
        include_usage: true,
    };

    /// Baidu Qianfan rejects `stream_options`
    pub const QIANFAN: Self = Self {
        id: "qianfan",
        default_base_url: "https://qianfan.baidubce.com/v2",
        api_key_var: "QIANFAN_API_KEY",
        include_usage: false,
    };

    pub(crate) fn wire(request: &Request, config: &ModelConfig, include_usage: bool) -> Result<Value, LlmError> {
        finish_wire(&to_openai(request, config, include_usage), &request.overrides)
    }
}

impl sealed::Sealed for OpenAiProvider {}

impl Provider for OpenAiProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn api_key_var(&self) -> &'static str {
        self.api_key_var
    }

    fn endpoint(&self, config: &ModelConfig) -> Result<Url, LlmError> {
        join_url(&base_url(config, self.default_base_url)?, "chat/completions")
    }

    fn to_wire(&self, request: &Request, config: &ModelConfig) -> Result<Value, LlmError> {
        Self::wire(request, config, self.include_usage)
    }

    fn decoder(&self) -> Box<dyn ChunkDecoder> {
        Box::new(OpenAiDecoder)
    }
}
