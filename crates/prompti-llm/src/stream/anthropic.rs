//! Messages API event decoding

use serde_json::Value;

use super::{ChunkDecoder, Fragment};
use crate::assembler::{CloseMode, ToolCallDelta};
use crate::protocol::anthropic::{
    AnthropicBlock, AnthropicResponse, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicUsage,
};
use crate::types::Usage;

/// Decoder for Anthropic-style vendors
#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicDecoder;

impl ChunkDecoder for AnthropicDecoder {
    fn close_mode(&self) -> CloseMode {
        CloseMode::Explicit
    }

    fn decode_chunk(&mut self, data: &str) -> Result<Vec<Fragment>, serde_json::Error> {
        let event: AnthropicStreamEvent = serde_json::from_str(data)?;
        let index = event.index.unwrap_or(0);
        let mut fragments = Vec::new();

        match event.event_type.as_str() {
            "message_start" => {
                if let Some(usage) = event.message.and_then(|message| message.usage) {
                    fragments.push(Fragment::Usage(usage_of(usage)));
                }
            }
            "content_block_start" => {
                if let Some(block) = event.content_block {
                    open_block(index, block, &mut fragments);
                }
            }
            "content_block_stop" => fragments.push(Fragment::ToolCallEnd(Some(index))),
            "message_stop" => fragments.push(Fragment::End),
            "error" => {
                let body = event.error.map_or_else(|| data.to_owned(), |error| error.to_string());
                fragments.push(Fragment::VendorError(body));
            }
            // content_block_delta, message_delta and untyped frames
            _ => {
                if let Some(delta) = event.delta {
                    apply_delta(index, delta, &mut fragments);
                }
                if let Some(usage) = event.usage {
                    fragments.push(Fragment::Usage(usage_of(usage)));
                }
            }
        }

        Ok(fragments)
    }

    fn decode_body(&mut self, body: &str) -> Result<Vec<Fragment>, serde_json::Error> {
        let response: AnthropicResponse = serde_json::from_str(body)?;
        let mut fragments = Vec::new();

        for block in &response.content {
            if block.block_type == "thinking"
                && let Some(thinking) = &block.thinking
            {
                fragments.push(Fragment::Thinking(thinking.clone()));
            }
        }

        let text: String = response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if !text.is_empty() {
            fragments.push(Fragment::Text(text));
        }

        let tool_blocks = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "tool_use");
        for (index, block) in (0..).zip(tool_blocks) {
            fragments.push(Fragment::ToolCall(ToolCallDelta {
                index,
                id: block.id,
                name: block.name,
                arguments: block.input.map(|input| input.to_string()).unwrap_or_default(),
            }));
            fragments.push(Fragment::ToolCallEnd(Some(index)));
        }

        if let Some(usage) = response.usage {
            fragments.push(Fragment::Usage(usage_of(usage)));
        }

        Ok(fragments)
    }
}

fn open_block(index: u32, block: AnthropicBlock, fragments: &mut Vec<Fragment>) {
    match block.block_type.as_str() {
        "text" => fragments.extend(block.text.map(Fragment::Text)),
        "thinking" => fragments.extend(block.thinking.map(Fragment::Thinking)),
        "tool_use" => fragments.push(Fragment::ToolCall(ToolCallDelta {
            index,
            id: block.id,
            name: block.name,
            arguments: initial_input(block.input),
        })),
        _ => {}
    }
}

fn apply_delta(index: u32, delta: AnthropicStreamDelta, fragments: &mut Vec<Fragment>) {
    if let Some(text) = delta.text {
        fragments.push(Fragment::Text(text));
    }
    if let Some(thinking) = delta.thinking {
        fragments.push(Fragment::Thinking(thinking));
    }
    if let Some(partial) = delta.partial_json {
        fragments.push(Fragment::ToolCall(ToolCallDelta {
            index,
            arguments: partial,
            ..ToolCallDelta::default()
        }));
    }
    // Some compatible vendors deliver a whole tool call in one delta
    if let Some(block) = delta.tool_use {
        fragments.push(Fragment::ToolCall(ToolCallDelta {
            index,
            id: block.id,
            name: block.name,
            arguments: block.input.map(|input| input.to_string()).unwrap_or_default(),
        }));
        fragments.push(Fragment::ToolCallEnd(Some(index)));
    }
    if delta.stop_reason.is_some() {
        fragments.push(Fragment::ToolCallEnd(None));
    }
}

/// Streams open tool blocks with `input: {}` and send the arguments as
/// `partial_json` deltas; only a non-empty initial input is kept
fn initial_input(input: Option<Value>) -> String {
    match input {
        Some(Value::Object(map)) if !map.is_empty() => Value::Object(map).to_string(),
        _ => String::new(),
    }
}

const fn usage_of(usage: AnthropicUsage) -> Usage {
    Usage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
    }
}
