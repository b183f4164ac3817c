use super::tool_call::apply_tool_call_delta;
use crate::types::{Frame, Message, Role};

/// What the caller should do after a frame has been folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFlow {
    Continue,
    /// The frame ends the current sub-stream pass.
    Terminal,
}

/// Folds one frame into the message log. Entries keep their first-seen
/// order; content and invocation updates happen in place.
///
/// Returns the index of the touched message, if any, alongside the flow.
pub fn apply_frame(log: &mut Vec<Message>, frame: &Frame) -> (FrameFlow, Option<usize>) {
    match frame {
        Frame::ContentDelta { message_id, text } => {
            let index = open_assistant_message(log, message_id);
            log[index].content.push_str(text);
            (FrameFlow::Continue, Some(index))
        }
        Frame::ToolCallDelta(delta) => {
            let index = open_assistant_message(log, &delta.message_id);
            apply_tool_call_delta(&mut log[index].invocations, delta);
            (FrameFlow::Continue, Some(index))
        }
        Frame::Usage { message_id, usage } => match find_assistant_message(log, message_id) {
            Some(index) => {
                log[index].usage = Some(*usage);
                (FrameFlow::Continue, Some(index))
            }
            None => {
                tracing::debug!(message_id = %message_id, "usage for unknown message dropped");
                (FrameFlow::Continue, None)
            }
        },
        Frame::ToolResult { call_id, content } => {
            log.push(Message::tool_result(call_id.clone(), content.clone()));
            (FrameFlow::Continue, Some(log.len() - 1))
        }
        Frame::Interrupt(_) => (FrameFlow::Continue, None),
        Frame::Error { .. } | Frame::EndOfStream => (FrameFlow::Terminal, None),
    }
}

fn find_assistant_message(log: &[Message], message_id: &str) -> Option<usize> {
    log.iter()
        .rposition(|message| message.role == Role::Assistant && message.id == message_id)
}

fn open_assistant_message(log: &mut Vec<Message>, message_id: &str) -> usize {
    find_assistant_message(log, message_id).unwrap_or_else(|| {
        log.push(Message::assistant(message_id));
        log.len() - 1
    })
}
