//! Chat completion chunk decoding

use super::{ChunkDecoder, Fragment};
use crate::assembler::{CloseMode, ToolCallDelta};
use crate::protocol::openai::{OpenAiResponse, OpenAiStreamChunk, OpenAiUsage};
use crate::types::Usage;

/// Decoder for `OpenAI` and compatible vendors
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiDecoder;

impl ChunkDecoder for OpenAiDecoder {
    fn close_mode(&self) -> CloseMode {
        CloseMode::OnNewIndex
    }

    fn decode_chunk(&mut self, data: &str) -> Result<Vec<Fragment>, serde_json::Error> {
        let chunk: OpenAiStreamChunk = serde_json::from_str(data)?;
        let mut fragments = Vec::new();

        // Only the first choice is surfaced when n > 1
        if let Some(choice) = chunk.choices.into_iter().find(|choice| choice.index == 0) {
            let delta = choice.delta;

            if let Some(reasoning) = delta.reasoning_content {
                fragments.push(Fragment::Thinking(reasoning));
            }
            if let Some(content) = delta.content {
                fragments.push(Fragment::Text(content));
            }

            for (position, call) in delta.tool_calls.unwrap_or_default().into_iter().enumerate() {
                let function = call.function.unwrap_or_default();
                fragments.push(Fragment::ToolCall(ToolCallDelta {
                    index: call.index.unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX)),
                    id: call.id,
                    name: function.name,
                    arguments: function.arguments.unwrap_or_default(),
                }));
            }

            if let Some(function) = delta.function_call {
                fragments.push(Fragment::ToolCall(legacy_call(function.name, function.arguments.unwrap_or_default())));
            }

            if choice.finish_reason.is_some() {
                fragments.push(Fragment::ToolCallEnd(None));
            }
        }

        if let Some(usage) = chunk.usage {
            fragments.push(Fragment::Usage(usage_of(usage)));
        }

        Ok(fragments)
    }

    fn decode_body(&mut self, body: &str) -> Result<Vec<Fragment>, serde_json::Error> {
        let response: OpenAiResponse = serde_json::from_str(body)?;
        let mut fragments = Vec::new();

        if let Some(choice) = response.choices.into_iter().next() {
            let message = choice.message;

            if let Some(reasoning) = message.reasoning_content {
                fragments.push(Fragment::Thinking(reasoning));
            }
            if let Some(content) = message.content {
                fragments.push(Fragment::Text(content));
            }

            let calls = message.tool_calls.unwrap_or_default();
            let has_calls = !calls.is_empty() || message.function_call.is_some();
            for (index, call) in (0..).zip(calls) {
                fragments.push(Fragment::ToolCall(ToolCallDelta {
                    index,
                    id: Some(call.id),
                    name: Some(call.function.name),
                    arguments: call.function.arguments,
                }));
            }
            if let Some(function) = message.function_call {
                fragments.push(Fragment::ToolCall(legacy_call(Some(function.name), function.arguments)));
            }
            if has_calls {
                fragments.push(Fragment::ToolCallEnd(None));
            }
        }

        if let Some(usage) = response.usage {
            fragments.push(Fragment::Usage(usage_of(usage)));
        }

        Ok(fragments)
    }
}

/// `function_call` replies carry one call at a time and no id; the
/// assembler generates one
const fn legacy_call(name: Option<String>, arguments: String) -> ToolCallDelta {
    ToolCallDelta {
        index: 0,
        id: None,
        name,
        arguments,
    }
}

const fn usage_of(usage: OpenAiUsage) -> Usage {
    Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
    }
}
