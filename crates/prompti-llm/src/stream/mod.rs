//! Response decoding
//!
//! A [`ChunkDecoder`] turns one vendor payload (an SSE `data:` line or a
//! whole non-streaming body) into [`Fragment`]s. [`StreamDecoder`] owns the
//! per-attempt state around it: the lifecycle, the tool call assembler and
//! the usage tally.

pub mod anthropic;
pub mod openai;

use crate::assembler::{CloseMode, ToolCallAssembler, ToolCallDelta};
use crate::types::{StreamEvent, ToolUse, Usage, VendorError};

/// Data line that ends an `OpenAI`-style stream
pub const DONE_MARKER: &str = "[DONE]";

/// Decoded piece of a vendor payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Thinking(String),
    ToolCall(ToolCallDelta),
    /// The vendor closed one tool call block, or all of them when `None`
    ToolCallEnd(Option<u32>),
    Usage(Usage),
    /// Error frame inside an otherwise successful stream
    VendorError(String),
    /// The vendor signalled the end of the message
    End,
}

/// Vendor-specific payload parser
///
/// One instance serves one attempt; implementations may keep state between
/// chunks.
pub trait ChunkDecoder: Send {
    /// How the vendor delimits streamed tool calls
    fn close_mode(&self) -> CloseMode;

    /// Decode one streamed `data:` payload
    ///
    /// # Errors
    ///
    /// Returns the JSON error for a malformed payload; callers skip it
    fn decode_chunk(&mut self, data: &str) -> Result<Vec<Fragment>, serde_json::Error>;

    /// Decode a complete non-streaming body
    ///
    /// # Errors
    ///
    /// Returns the JSON error for a malformed body
    fn decode_body(&mut self, body: &str) -> Result<Vec<Fragment>, serde_json::Error>;
}

/// Lifecycle of one attempt's response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    AwaitingFirstByte,
    Streaming,
    Done,
    Errored,
}

/// Per-attempt decoding state
pub struct StreamDecoder {
    state: DecoderState,
    status: u16,
    decoder: Box<dyn ChunkDecoder>,
    assembler: ToolCallAssembler,
    usage: Usage,
    tool_budget: Option<usize>,
}

impl StreamDecoder {
    /// Fresh state around `decoder`; at most `max_calls` tool calls are emitted
    pub fn new(decoder: Box<dyn ChunkDecoder>, max_calls: Option<usize>) -> Self {
        let assembler = ToolCallAssembler::new(decoder.close_mode());

        Self {
            state: DecoderState::AwaitingFirstByte,
            status: 200,
            decoder,
            assembler,
            usage: Usage::default(),
            tool_budget: max_calls,
        }
    }

    pub const fn state(&self) -> DecoderState {
        self.state
    }

    /// Usage reported so far in this attempt
    pub const fn usage(&self) -> Usage {
        self.usage
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self.state, DecoderState::Done | DecoderState::Errored)
    }

    /// Record the HTTP status of the response being decoded
    pub const fn on_response(&mut self, status: u16) {
        self.status = status;
    }

    /// Feed one streamed `data:` payload
    pub fn on_data(&mut self, data: &str) -> Vec<StreamEvent> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.state = DecoderState::Streaming;

        let data = data.trim();
        if data.is_empty() {
            return Vec::new();
        }
        if data == DONE_MARKER {
            return self.finish();
        }

        match self.decoder.decode_chunk(data) {
            Ok(fragments) => self.apply(fragments),
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                Vec::new()
            }
        }
    }

    /// Feed a complete non-streaming body and finish
    pub fn on_body(&mut self, body: String) -> Vec<StreamEvent> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.state = DecoderState::Streaming;

        match self.decoder.decode_body(&body) {
            Ok(fragments) => {
                let mut events = self.apply(fragments);
                events.extend(self.finish());
                events
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparseable response body");
                vec![self.fail(self.status, body)]
            }
        }
    }

    /// Terminal error event for a vendor-reported failure
    ///
    /// Open tool calls are discarded.
    pub fn fail(&mut self, status: u16, body: String) -> StreamEvent {
        self.state = DecoderState::Errored;
        drop(self.assembler.finish());
        StreamEvent::Error(VendorError { status, body })
    }

    /// End of input; closes any open tool calls
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.state = DecoderState::Done;

        let calls = self.assembler.finish();
        self.admit(calls)
    }

    fn apply(&mut self, fragments: Vec<Fragment>) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        for fragment in fragments {
            match fragment {
                Fragment::Text(text) if !text.is_empty() => events.push(StreamEvent::Text(text)),
                Fragment::Thinking(text) if !text.is_empty() => events.push(StreamEvent::Thinking(text)),
                Fragment::Text(_) | Fragment::Thinking(_) => {}
                Fragment::ToolCall(delta) => {
                    let closed = self.assembler.push(delta);
                    events.extend(self.admit(closed));
                }
                Fragment::ToolCallEnd(index) => {
                    let closed = self.assembler.close(index);
                    events.extend(self.admit(closed));
                }
                Fragment::Usage(usage) => self.usage.absorb(usage),
                Fragment::VendorError(body) => {
                    events.push(self.fail(self.status, body));
                    break;
                }
                Fragment::End => {
                    events.extend(self.finish());
                    break;
                }
            }
        }

        events
    }

    /// Apply the tool call cap
    fn admit(&mut self, calls: Vec<ToolUse>) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(calls.len());

        for call in calls {
            match &mut self.tool_budget {
                Some(0) => {
                    tracing::warn!(tool = %call.name, "dropping tool call beyond max_calls");
                }
                Some(remaining) => {
                    *remaining -= 1;
                    events.push(StreamEvent::ToolUse(call));
                }
                None => events.push(StreamEvent::ToolUse(call)),
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::stream::openai::OpenAiDecoder;

    fn decoder(max_calls: Option<usize>) -> StreamDecoder {
        StreamDecoder::new(Box::new(OpenAiDecoder), max_calls)
    }

    fn tool_chunk(index: u32, id: Option<&str>, arguments: &str) -> String {
        json!({
            "choices": [{
                "delta": {"tool_calls": [{
                    "index": index,
                    "id": id,
                    "function": {"name": id.map(|_| "get_time"), "arguments": arguments}
                }]}
            }]
        })
        .to_string()
    }

    #[test]
    fn state_moves_from_awaiting_to_done() {
        let mut decoder = decoder(None);
        assert_eq!(decoder.state(), DecoderState::AwaitingFirstByte);

        let events = decoder.on_data(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#);
        assert_eq!(events, vec![StreamEvent::Text("Hel".to_owned())]);
        assert_eq!(decoder.state(), DecoderState::Streaming);

        assert!(decoder.on_data("[DONE]").is_empty());
        assert_eq!(decoder.state(), DecoderState::Done);

        // Nothing after the terminator is parsed
        assert!(decoder.on_data(r#"{"choices":[{"delta":{"content":"late"}}]}"#).is_empty());
    }

    #[test]
    fn malformed_chunks_are_skipped() {
        let mut decoder = decoder(None);
        assert!(decoder.on_data("{not json").is_empty());
        assert!(decoder.on_data("").is_empty());

        let events = decoder.on_data(r#"{"choices":[{"delta":{"content":"ok"}}]}"#);
        assert_eq!(events, vec![StreamEvent::Text("ok".to_owned())]);
    }

    #[test]
    fn fail_is_terminal_and_drops_open_calls() {
        let mut decoder = decoder(None);
        decoder.on_data(&tool_chunk(0, Some("call_1"), "{\"a\""));

        let event = decoder.fail(500, "boom".to_owned());
        assert_eq!(
            event,
            StreamEvent::Error(VendorError {
                status: 500,
                body: "boom".to_owned()
            })
        );
        assert_eq!(decoder.state(), DecoderState::Errored);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn stream_end_flushes_tool_calls() {
        let mut decoder = decoder(None);
        decoder.on_data(&tool_chunk(0, Some("call_1"), ""));
        decoder.on_data(&tool_chunk(0, None, "{\"tz\":"));
        decoder.on_data(&tool_chunk(0, None, "\"UTC\"}"));

        let events = decoder.finish();
        let [StreamEvent::ToolUse(call)] = events.as_slice() else {
            panic!("expected one tool call, got {events:?}");
        };
        assert_eq!(call.arguments, json!({"tz": "UTC"}));
    }

    #[test]
    fn max_calls_caps_emitted_tool_calls() {
        let mut decoder = decoder(Some(1));
        decoder.on_data(&tool_chunk(0, Some("a"), "{}"));
        let first = decoder.on_data(&tool_chunk(1, Some("b"), "{}"));
        let rest = decoder.finish();

        assert_eq!(first.len(), 1);
        assert!(rest.is_empty());
    }

    #[test]
    fn usage_is_tallied_not_emitted() {
        let mut decoder = decoder(None);
        let events = decoder.on_data(r#"{"choices":[],"usage":{"prompt_tokens":9,"completion_tokens":3}}"#);

        assert!(events.is_empty());
        assert_eq!(
            decoder.usage(),
            Usage {
                prompt_tokens: 9,
                completion_tokens: 3
            }
        );
    }

    #[test]
    fn legacy_function_call_becomes_tool_use() {
        let mut decoder = decoder(None);
        let body = json!({"choices": [{"message": {
            "function_call": {"name": "get_time", "arguments": "{\"tz\":\"UTC\"}"}
        }}]});

        let events = decoder.on_body(body.to_string());
        let [StreamEvent::ToolUse(call)] = events.as_slice() else {
            panic!("expected one tool call, got {events:?}");
        };
        assert_eq!(call.name, "get_time");
        assert!(call.id.starts_with("call_"));
        assert_eq!(call.arguments, json!({"tz": "UTC"}));
    }

    #[test]
    fn unparseable_body_is_an_error_event() {
        let mut decoder = decoder(None);
        decoder.on_response(200);

        let events = decoder.on_body("<html>gateway</html>".to_owned());
        assert_eq!(
            events,
            vec![StreamEvent::Error(VendorError {
                status: 200,
                body: "<html>gateway</html>".to_owned()
            })]
        );
    }
}
