use super::client::ByteStream;
use super::logging::emit_decode_error;
use crate::error::DecodeError;
use crate::types::api::{
    content_text, ErrorRecord, InterruptRecord, LegacyEnvelope, LegacyMessageRecord,
    LegacyUsageRecord, MessageChunkRecord, ToolCallChunkRecord, ToolRecord, UsageRecord,
};
use crate::types::{Frame, InterruptFrame, TokenUsage, ToolCallDelta};
use anyhow::Result;
use base64::prelude::*;
use futures::{stream, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;

/// Incremental line decoder. Bytes are buffered raw so a chunk boundary may
/// fall anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }

        self.buffer.extend_from_slice(chunk);
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|byte| *byte == b'\n') {
            let end = start + offset;
            let reached_end = collect_line(&self.buffer[start..end], &mut frames);
            start = end + 1;
            if reached_end {
                self.finished = true;
                break;
            }
        }

        if self.finished {
            self.buffer.clear();
        } else if start > 0 {
            self.buffer.drain(..start);
        }

        frames
    }

    /// Flushes the trailing partial line and closes the sequence. Emits
    /// `EndOfStream` unless the backend already sent one.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }

        let rest = std::mem::take(&mut self.buffer);
        if !rest.is_empty() {
            collect_line(&rest, &mut frames);
        }
        if !matches!(frames.last(), Some(Frame::EndOfStream)) {
            frames.push(Frame::EndOfStream);
        }
        self.finished = true;
        frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Lazily decodes a transport byte stream into frames. Transport errors end
/// the sequence; malformed lines are dropped.
pub fn frame_stream(bytes: ByteStream) -> FrameStream {
    struct State {
        bytes: ByteStream,
        decoder: FrameDecoder,
        pending: VecDeque<Frame>,
        done: bool,
    }

    let state = State {
        bytes,
        decoder: FrameDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.decoder.process(&chunk)),
                Some(Err(error)) => {
                    state.done = true;
                    return Some((Err(error), state));
                }
                None => state.pending.extend(state.decoder.finish()),
            }

            if state.decoder.is_finished() {
                state.done = true;
            }
        }
    }))
}

/// Decodes one line into `frames`; returns true once the end marker is seen.
fn collect_line(line: &[u8], frames: &mut Vec<Frame>) -> bool {
    match decode_line(line) {
        Ok(decoded) => {
            for frame in decoded {
                let is_end = frame == Frame::EndOfStream;
                frames.push(frame);
                if is_end {
                    return true;
                }
            }
            false
        }
        Err(error) => {
            emit_decode_error(line, &error);
            false
        }
    }
}

pub fn decode_line(line: &[u8]) -> std::result::Result<Vec<Frame>, DecodeError> {
    let text = String::from_utf8(line.to_vec())?;
    let text = text.trim();
    if text.is_empty()
        || text.starts_with(':')
        || text.starts_with("event:")
        || text.starts_with("id:")
        || text.starts_with("retry:")
    {
        return Ok(Vec::new());
    }

    if let Some(payload) = text.strip_prefix("data:") {
        let payload = payload.trim();
        if payload == "[DONE]" {
            return Ok(vec![Frame::EndOfStream]);
        }
        let decoded = String::from_utf8(BASE64_STANDARD.decode(payload)?)?;
        let envelope: LegacyEnvelope = serde_json::from_str(&decoded)?;
        return legacy_frames(envelope);
    }

    let record: Value = serde_json::from_str(text)?;
    record_frames(record)
}

fn record_frames(record: Value) -> std::result::Result<Vec<Frame>, DecodeError> {
    let kind = record
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let frames = match kind.as_str() {
        "AIMessageChunk" => {
            let chunk: MessageChunkRecord = serde_json::from_value(record)?;
            let usage = resolve_usage(
                chunk.usage_metadata,
                chunk.response_metadata.and_then(|meta| meta.token_usage),
            );
            message_frames(
                chunk.id,
                content_text(&chunk.content),
                chunk.tool_call_chunks,
                usage,
            )
        }
        "tool" => {
            let tool: ToolRecord = serde_json::from_value(record)?;
            vec![Frame::ToolResult {
                call_id: tool.tool_call_id,
                content: content_text(&tool.content),
            }]
        }
        "interrupt" => vec![interrupt_frame(serde_json::from_value(record)?)],
        "error" => {
            let error: ErrorRecord = serde_json::from_value(record)?;
            vec![Frame::Error {
                message: error.message,
            }]
        }
        "done" => vec![Frame::EndOfStream],
        _ => return Err(DecodeError::UnknownKind(kind)),
    };

    Ok(frames)
}

fn legacy_frames(envelope: LegacyEnvelope) -> std::result::Result<Vec<Frame>, DecodeError> {
    let frames = match envelope.event.as_str() {
        "message" => {
            let message: LegacyMessageRecord = serde_json::from_value(envelope.data)?;
            let usage = resolve_usage(message.usage, None);
            message_frames(message.id, message.content, message.tool_calls, usage)
        }
        "tool_result" => {
            let tool: ToolRecord = serde_json::from_value(envelope.data)?;
            vec![Frame::ToolResult {
                call_id: tool.tool_call_id,
                content: content_text(&tool.content),
            }]
        }
        "interrupt" => vec![interrupt_frame(serde_json::from_value(envelope.data)?)],
        "error" => {
            let error: ErrorRecord = serde_json::from_value(envelope.data)?;
            vec![Frame::Error {
                message: error.message,
            }]
        }
        "end" => vec![Frame::EndOfStream],
        _ => return Err(DecodeError::UnknownKind(envelope.event)),
    };

    Ok(frames)
}

fn message_frames(
    message_id: String,
    text: String,
    tool_calls: Vec<ToolCallChunkRecord>,
    usage: Option<TokenUsage>,
) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(tool_calls.len() + 2);

    if !text.is_empty() {
        frames.push(Frame::ContentDelta {
            message_id: message_id.clone(),
            text,
        });
    }

    for (offset, chunk) in tool_calls.into_iter().enumerate() {
        frames.push(Frame::ToolCallDelta(ToolCallDelta {
            message_id: message_id.clone(),
            position: chunk.index.unwrap_or(offset),
            name: chunk.name.filter(|name| !name.is_empty()),
            id: chunk.id.filter(|id| !id.is_empty()),
            argument_fragment: chunk.args.filter(|args| !args.is_empty()),
        }));
    }

    if let Some(usage) = usage {
        frames.push(Frame::Usage { message_id, usage });
    }

    frames
}

fn interrupt_frame(record: InterruptRecord) -> Frame {
    let parameters = if record.parameters.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        record.parameters
    };
    Frame::Interrupt(InterruptFrame {
        id: record.id,
        tool_name: record.tool_name,
        description: record.description,
        parameters,
        question: record.question.filter(|question| !question.trim().is_empty()),
    })
}

/// The primary usage field wins; the nested legacy shape is a fallback only.
fn resolve_usage(
    primary: Option<UsageRecord>,
    legacy: Option<LegacyUsageRecord>,
) -> Option<TokenUsage> {
    primary
        .map(|usage| TokenUsage::new(usage.input_tokens, usage.output_tokens, usage.total_tokens))
        .or_else(|| {
            legacy.map(|usage| {
                TokenUsage::new(
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    usage.total_tokens,
                )
            })
        })
}
