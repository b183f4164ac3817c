use super::{InterruptCoordinator, TurnPhase, TurnStatus};
use crate::api::{frame_stream, ByteStream};
use crate::error::{EngineError, ProtocolViolation, Result};
use crate::state::reconcile::{apply_frame, FrameFlow};
use crate::types::{Frame, InterruptDecision, Message, Outcome, ResumeRequest, TurnRequest};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// Result of folding one frame into the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Interrupted,
    Ended,
    Failed,
}

impl InterruptCoordinator {
    /// Starts a turn and drives its first sub-stream until it ends or
    /// pauses for approval.
    pub async fn send_turn(&mut self, text: impl Into<String>) -> Result<TurnStatus> {
        self.require_phase(TurnPhase::Idle, "send_turn")?;

        let text = text.into();
        let id = uuid::Uuid::new_v4().to_string();
        self.push_message(Message::user(id.clone(), text.clone()));
        self.set_phase(TurnPhase::Streaming);

        let request = TurnRequest { message: text, id };
        let opened = self.transport.open_turn(&request).await;
        Ok(self.drive(opened).await)
    }

    /// Answers the pending interrupt and drives the continuation sub-stream.
    ///
    /// Approving a file-editing tool persists the previewed content first; if
    /// that fails the call errors and the interrupt stays pending.
    pub async fn resolve_interrupt(&mut self, decision: InterruptDecision) -> Result<TurnStatus> {
        self.require_phase(TurnPhase::Interrupted, "resolve_interrupt")?;
        let Some(pending) = self.pending_interrupt.clone() else {
            return Err(ProtocolViolation::InvalidState {
                operation: "resolve_interrupt",
                phase: self.phase,
            }
            .into());
        };

        match (decision.outcome, &self.preview) {
            (Outcome::Approve, Some(preview)) => {
                self.file_store
                    .persist(&preview.path, &preview.content)
                    .map_err(|cause| EngineError::FileStore {
                        path: preview.path.clone(),
                        cause,
                    })?;
                tracing::info!(path = %preview.path, "approved edit persisted");
            }
            (Outcome::Reject, Some(preview)) => {
                tracing::debug!(path = %preview.path, "rejected edit discarded");
            }
            (_, None) => {}
        }

        let request = ResumeRequest {
            interrupt_id: pending.id,
            choice: decision.choice(),
            additional_data: decision.free_text.unwrap_or_default(),
        };
        self.clear_interrupt();
        self.set_phase(TurnPhase::Streaming);

        let opened = self.transport.open_resume(&request).await;
        Ok(self.drive(opened).await)
    }

    /// Folds one frame of the open sub-stream into the log and the
    /// interrupt slot. Frames outside `Streaming` are protocol violations and
    /// change nothing.
    pub fn handle_frame(
        &mut self,
        frame: Frame,
    ) -> std::result::Result<FrameOutcome, ProtocolViolation> {
        match (self.phase, &frame) {
            (TurnPhase::Streaming, _) => {}
            (TurnPhase::Interrupted, Frame::Interrupt(incoming)) => {
                return Err(ProtocolViolation::InterruptWhileInterrupted {
                    pending: self
                        .pending_interrupt
                        .as_ref()
                        .map(|pending| pending.id.clone())
                        .unwrap_or_default(),
                    incoming: incoming.id.clone(),
                });
            }
            (phase, _) => {
                return Err(ProtocolViolation::InvalidState {
                    operation: "handle_frame",
                    phase,
                });
            }
        }

        match frame {
            Frame::Interrupt(interrupt) => {
                self.expose_interrupt(interrupt.into());
                Ok(FrameOutcome::Interrupted)
            }
            Frame::Error { message } => {
                self.fail_stream(message);
                Ok(FrameOutcome::Failed)
            }
            frame => {
                let (flow, touched) = apply_frame(&mut self.messages, &frame);
                if let Some(index) = touched {
                    self.emit_message_at(index);
                }
                match flow {
                    FrameFlow::Continue => Ok(FrameOutcome::Continue),
                    FrameFlow::Terminal => {
                        self.finish_stream();
                        Ok(FrameOutcome::Ended)
                    }
                }
            }
        }
    }

    async fn drive(&mut self, opened: anyhow::Result<ByteStream>) -> TurnStatus {
        let bytes = match opened {
            Ok(bytes) => bytes,
            Err(error) => return self.fail_stream(format!("{error:#}")),
        };

        let mut frames = frame_stream(bytes);
        let cancel = self.cancel.clone();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.cancel = CancellationToken::new();
                    return self.fail_stream("stream cancelled".to_string());
                }
                next = frames.next() => next,
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(error)) => return self.fail_stream(format!("{error:#}")),
                None => return self.finish_stream(),
            };

            match self.handle_frame(frame) {
                Ok(FrameOutcome::Continue) => {}
                Ok(FrameOutcome::Interrupted) => return TurnStatus::Interrupted,
                Ok(FrameOutcome::Ended) => return TurnStatus::Completed,
                Ok(FrameOutcome::Failed) => {
                    let error = self
                        .messages
                        .last()
                        .map(|message| message.content.clone())
                        .unwrap_or_default();
                    return TurnStatus::Failed { error };
                }
                Err(violation) => return self.fail_stream(violation.to_string()),
            }
        }
    }
}
