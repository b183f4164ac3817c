//! Error types for the turn engine.
//!
//! Transport, config and file-store plumbing uses `anyhow`; these enums are
//! what callers of the engine match on.

use crate::state::TurnPhase;
use thiserror::Error;

/// A result type using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced to callers of the coordinator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The call does not fit the protocol state; nothing was changed.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// A file-editing instruction could not be turned into content.
    #[error("invalid patch instruction: {0}")]
    Patch(#[from] PatchError),

    /// The file-store collaborator failed to read or persist content.
    #[error("file store error for '{path}': {cause:#}")]
    FileStore {
        /// Path handed to the store.
        path: String,
        /// Underlying store failure.
        cause: anyhow::Error,
    },
}

/// Calls or frames that are out of order for the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// An operation was invoked in a phase that does not allow it.
    #[error("{operation} is not allowed while {phase}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// Phase at the time of the call.
        phase: TurnPhase,
    },

    /// The backend sent a second interrupt before the first was resolved.
    #[error("interrupt '{incoming}' received while '{pending}' is still pending")]
    InterruptWhileInterrupted {
        /// Id of the interrupt awaiting a decision.
        pending: String,
        /// Id of the interrupt that arrived.
        incoming: String,
    },
}

/// One malformed stream line. Recovered by skipping the line.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown record kind '{0}'")]
    UnknownKind(String),
}

/// Rejected patch instructions. A diff block that simply does not match is
/// not an error; see `file_patch::PatchReport`.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("search text must not be empty")]
    EmptySearch,

    #[error("diff block {block} has no search lines")]
    EmptySearchLines { block: usize },

    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("tool '{tool}' is missing parameter '{parameter}'")]
    MissingParameter {
        tool: String,
        parameter: &'static str,
    },

    #[error("tool '{0}' does not edit files")]
    NotAFileTool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message_names_operation_and_phase() {
        let error = EngineError::from(ProtocolViolation::InvalidState {
            operation: "resolve_interrupt",
            phase: TurnPhase::Idle,
        });
        assert_eq!(
            error.to_string(),
            "protocol violation: resolve_interrupt is not allowed while idle"
        );
    }

    #[test]
    fn test_file_store_error_includes_path_and_cause() {
        let error = EngineError::FileStore {
            path: "src/lib.rs".to_string(),
            cause: anyhow::anyhow!("disk full"),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("src/lib.rs"));
        assert!(rendered.contains("disk full"));
    }
}
