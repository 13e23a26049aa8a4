//! Reassembly of tool calls streamed in fragments
//!
//! `OpenAI`-style vendors key fragments by an `index` and never say when a
//! call is complete, so a new index implicitly closes the open ones.
//! Anthropic-style vendors open a content block per call and close it
//! explicitly. Both close everything at the end of the stream.

use serde_json::Value;

use crate::types::ToolUse;

/// One fragment of a tool call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    /// Key shared by all fragments of one call
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Next slice of the JSON-encoded arguments
    pub arguments: String,
}

/// When an open call is considered complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// A fragment with a different index closes the open calls
    OnNewIndex,
    /// Only an explicit close or the end of the stream closes a call
    Explicit,
}

/// A tool call still receiving fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialToolCall {
    pub index: u32,
    pub id: Option<String>,
    pub name: String,
    pub arguments: String,
}

impl PartialToolCall {
    fn absorb(&mut self, delta: ToolCallDelta) {
        if self.id.is_none() {
            self.id = delta.id.filter(|id| !id.is_empty());
        }
        if let Some(name) = delta.name {
            self.name.push_str(&name);
        }
        self.arguments.push_str(&delta.arguments);
    }

    /// Parse the accumulated arguments
    ///
    /// Unparseable or empty argument text degrades to `{}`. A call without a
    /// vendor id gets a generated one.
    fn finalize(self) -> ToolUse {
        let arguments = if self.arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&self.arguments).unwrap_or_else(|e| {
                tracing::warn!(tool = %self.name, error = %e, "tool call arguments are not valid JSON");
                Value::Object(serde_json::Map::new())
            })
        };

        ToolUse {
            id: self
                .id
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
            name: self.name,
            arguments,
        }
    }
}

/// Per-attempt tool call buffers
#[derive(Debug)]
pub struct ToolCallAssembler {
    mode: CloseMode,
    open: Vec<PartialToolCall>,
}

impl ToolCallAssembler {
    pub const fn new(mode: CloseMode) -> Self {
        Self { mode, open: Vec::new() }
    }

    /// Feed one fragment; returns calls it implicitly closed
    pub fn push(&mut self, delta: ToolCallDelta) -> Vec<ToolUse> {
        let mut closed = Vec::new();

        if self.mode == CloseMode::OnNewIndex && self.open.iter().any(|call| call.index != delta.index) {
            let (done, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.open)
                .into_iter()
                .partition(|call| call.index != delta.index);
            self.open = keep;
            closed = finalize_all(done);
        }

        match self.open.iter_mut().find(|call| call.index == delta.index) {
            Some(call) => call.absorb(delta),
            None => {
                let mut call = PartialToolCall {
                    index: delta.index,
                    ..PartialToolCall::default()
                };
                call.absorb(delta);
                self.open.push(call);
            }
        }

        closed
    }

    /// Close the call with `index`, or every open call when `None`
    pub fn close(&mut self, index: Option<u32>) -> Vec<ToolUse> {
        let Some(index) = index else {
            return self.finish();
        };

        match self.open.iter().position(|call| call.index == index) {
            Some(position) => vec![self.open.remove(position).finalize()],
            None => Vec::new(),
        }
    }

    /// Close everything still open, in the order calls were started
    pub fn finish(&mut self) -> Vec<ToolUse> {
        finalize_all(std::mem::take(&mut self.open))
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

fn finalize_all(calls: Vec<PartialToolCall>) -> Vec<ToolUse> {
    calls.into_iter().map(PartialToolCall::finalize).collect()
}
