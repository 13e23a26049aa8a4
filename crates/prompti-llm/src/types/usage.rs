use serde::{Deserialize, Serialize};

/// Token usage reported by a vendor for one attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt (input) tokens
    pub prompt_tokens: u64,
    /// Completion (output) tokens
    pub completion_tokens: u64,
}

impl Usage {
    pub const fn is_empty(&self) -> bool {
        self.prompt_tokens == 0 && self.completion_tokens == 0
    }

    /// Fold another report into this one
    ///
    /// Vendors report running totals (Anthropic sends input tokens at message
    /// start and cumulative output tokens at message end), so each field keeps
    /// the largest value seen.
    pub fn absorb(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.max(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.max(other.completion_tokens);
    }
}
