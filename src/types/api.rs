//! Request bodies sent to the backend and the raw records it streams back.
//!
//! Records are deserialized here and mapped onto `Frame` by
//! `api::stream::FrameDecoder`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a new-turn request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    /// Client-generated id correlating the turn with its first frames.
    pub id: String,
}

/// Body of a resume request answering a pending interrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub interrupt_id: String,
    pub choice: ResumeChoice,
    pub additional_data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResumeChoice {
    #[serde(rename = "1")]
    Approve,
    #[serde(rename = "2")]
    Reject,
}

impl ResumeChoice {
    pub fn code(self) -> &'static str {
        match self {
            ResumeChoice::Approve => "1",
            ResumeChoice::Reject => "2",
        }
    }
}

/// `{"type":"AIMessageChunk", ...}` record of the current line format.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageChunkRecord {
    pub id: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub tool_call_chunks: Vec<ToolCallChunkRecord>,
    #[serde(default)]
    pub usage_metadata: Option<UsageRecord>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallChunkRecord {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "arguments")]
    pub args: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UsageRecord {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub token_usage: Option<LegacyUsageRecord>,
}

/// Nested usage shape some backends still send under `response_metadata`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LegacyUsageRecord {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolRecord {
    pub tool_call_id: String,
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterruptRecord {
    #[serde(alias = "interrupt_id")]
    pub id: String,
    #[serde(alias = "name")]
    pub tool_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorRecord {
    #[serde(default, alias = "error")]
    pub message: String,
}

/// Decoded body of a legacy `data: <base64>` line.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyMessageRecord {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallChunkRecord>,
    #[serde(default)]
    pub usage: Option<UsageRecord>,
}

/// Flattens string or `[{"type":"text","text":..}]` content into text.
pub fn content_text(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                other => other.get("text").and_then(Value::as_str),
            })
            .collect(),
        other => other.to_string(),
    }
}
