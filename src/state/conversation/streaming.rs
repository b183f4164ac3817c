use super::{EngineUpdate, InterruptCoordinator, TurnPhase, TurnStatus};
use crate::types::{Message, PendingInterrupt};
use tokio::sync::mpsc;

impl InterruptCoordinator {
    pub(super) fn push_message(&mut self, message: Message) {
        self.messages.push(message.clone());
        emit_update(
            self.updates.as_ref(),
            EngineUpdate::MessageUpserted {
                index: self.messages.len() - 1,
                message,
            },
        );
    }

    pub(super) fn emit_message_at(&self, index: usize) {
        if let Some(message) = self.messages.get(index) {
            emit_update(
                self.updates.as_ref(),
                EngineUpdate::MessageUpserted {
                    index,
                    message: message.clone(),
                },
            );
        }
    }

    pub(super) fn set_phase(&mut self, phase: TurnPhase) {
        if self.phase == phase {
            return;
        }
        tracing::debug!(from = %self.phase, to = %phase, "turn phase changed");
        self.phase = phase;
        emit_update(self.updates.as_ref(), EngineUpdate::PhaseChanged(phase));
    }

    pub(super) fn expose_interrupt(&mut self, interrupt: PendingInterrupt) {
        let preview = self.prepare_preview(&interrupt);
        tracing::debug!(
            interrupt_id = %interrupt.id,
            tool = %interrupt.tool_name,
            has_preview = preview.is_some(),
            "turn interrupted for approval"
        );
        self.pending_interrupt = Some(interrupt.clone());
        self.preview = preview.clone();
        self.set_phase(TurnPhase::Interrupted);
        emit_update(
            self.updates.as_ref(),
            EngineUpdate::InterruptPending { interrupt, preview },
        );
    }

    pub(super) fn clear_interrupt(&mut self) {
        let had_interrupt = self.pending_interrupt.take().is_some();
        self.preview = None;
        if had_interrupt {
            emit_update(self.updates.as_ref(), EngineUpdate::InterruptCleared);
        }
    }

    /// Closes the sub-stream normally.
    pub(super) fn finish_stream(&mut self) -> TurnStatus {
        self.clear_interrupt();
        self.set_phase(TurnPhase::Idle);
        TurnStatus::Completed
    }

    /// Closes the sub-stream with an error entry in the log.
    pub(super) fn fail_stream(&mut self, error: String) -> TurnStatus {
        tracing::warn!(error = %error, "sub-stream failed");
        self.push_message(Message::error(
            format!("error-{}", uuid::Uuid::new_v4()),
            error.clone(),
        ));
        self.clear_interrupt();
        self.set_phase(TurnPhase::Idle);
        TurnStatus::Failed { error }
    }
}

pub(super) fn emit_update(
    updates: Option<&mpsc::UnboundedSender<EngineUpdate>>,
    update: EngineUpdate,
) {
    if let Some(tx) = updates {
        let _ = tx.send(update);
    }
}
