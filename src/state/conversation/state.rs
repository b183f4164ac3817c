use crate::api::TurnTransport;
use crate::edit_diff::{diff_hunks, format_preview_hunks, DiffHunk, DEFAULT_PREVIEW_CONTEXT_LINES};
use crate::error::ProtocolViolation;
use crate::tools::FileStore;
use crate::types::{Message, PendingInterrupt};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Streaming,
    Interrupted,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Streaming => "streaming",
            TurnPhase::Interrupted => "interrupted",
        })
    }
}

/// How a driven sub-stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    Completed,
    /// Waiting for `resolve_interrupt`.
    Interrupted,
    /// The stream failed; the error is also in the message log.
    Failed { error: String },
}

/// Prospective content for a file-editing tool awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchPreview {
    pub path: String,
    pub original: String,
    pub content: String,
    pub hunks: Vec<DiffHunk>,
}

impl PatchPreview {
    pub fn new(path: String, original: String, content: String) -> Self {
        let hunks = diff_hunks(&original, &content, DEFAULT_PREVIEW_CONTEXT_LINES);
        Self {
            path,
            original,
            content,
            hunks,
        }
    }

    pub fn rendered_diff(&self) -> String {
        format_preview_hunks(&self.hunks)
    }
}

/// Read-only view handed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: TurnPhase,
    pub messages: Vec<Message>,
    pub pending_interrupt: Option<PendingInterrupt>,
    pub preview: Option<PatchPreview>,
}

impl Snapshot {
    pub fn preview_content(&self) -> Option<&str> {
        self.preview.as_ref().map(|preview| preview.content.as_str())
    }
}

/// Change notifications for the UI.
#[derive(Debug, Clone)]
pub enum EngineUpdate {
    MessageUpserted {
        index: usize,
        message: Message,
    },
    InterruptPending {
        interrupt: PendingInterrupt,
        preview: Option<PatchPreview>,
    },
    InterruptCleared,
    PhaseChanged(TurnPhase),
}

/// Owns the message log and the pending-interrupt slot for one
/// conversation, and drives the pause/resume cycle of each turn.
pub struct InterruptCoordinator {
    pub(super) transport: Arc<dyn TurnTransport>,
    pub(super) file_store: Arc<dyn FileStore>,
    pub(super) messages: Vec<Message>,
    pub(super) pending_interrupt: Option<PendingInterrupt>,
    pub(super) preview: Option<PatchPreview>,
    pub(super) phase: TurnPhase,
    pub(super) updates: Option<mpsc::UnboundedSender<EngineUpdate>>,
    pub(super) cancel: CancellationToken,
}

impl InterruptCoordinator {
    pub fn new(transport: Arc<dyn TurnTransport>, file_store: Arc<dyn FileStore>) -> Self {
        Self {
            transport,
            file_store,
            messages: Vec::new(),
            pending_interrupt: None,
            preview: None,
            phase: TurnPhase::Idle,
            updates: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_updates(mut self, updates: mpsc::UnboundedSender<EngineUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_interrupt(&self) -> Option<&PendingInterrupt> {
        self.pending_interrupt.as_ref()
    }

    pub fn preview(&self) -> Option<&PatchPreview> {
        self.preview.as_ref()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            messages: self.messages.clone(),
            pending_interrupt: self.pending_interrupt.clone(),
            preview: self.preview.clone(),
        }
    }

    /// Token that aborts the sub-stream being driven, or the next one if
    /// cancelled while idle. Once a cancellation is consumed the coordinator
    /// swaps in a fresh token, so fetch it before each call.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(super) fn require_phase(
        &self,
        expected: TurnPhase,
        operation: &'static str,
    ) -> Result<(), ProtocolViolation> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ProtocolViolation::InvalidState {
                operation,
                phase: self.phase,
            })
        }
    }
}
