use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded unit of the streaming protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    ContentDelta {
        message_id: String,
        text: String,
    },
    ToolCallDelta(ToolCallDelta),
    Usage {
        message_id: String,
        usage: TokenUsage,
    },
    Interrupt(InterruptFrame),
    ToolResult {
        call_id: String,
        content: String,
    },
    Error {
        message: String,
    },
    EndOfStream,
}

/// A fragment of one tool invocation, addressed by its position in the
/// message's invocation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub message_id: String,
    pub position: usize,
    pub name: Option<String>,
    pub id: Option<String>,
    pub argument_fragment: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl TokenUsage {
    /// Builds usage counts, deriving the total when the backend omits it.
    pub fn new(input: u64, output: u64, total: Option<u64>) -> Self {
        Self {
            input,
            output,
            total: total.unwrap_or(input.saturating_add(output)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptFrame {
    pub id: String,
    pub tool_name: String,
    pub description: String,
    pub parameters: Value,
    pub question: Option<String>,
}
