//! Client-side engine for streamed assistant turns that can pause for
//! human approval of tool calls and resume afterwards.

pub mod api;
pub mod config;
pub mod edit_diff;
pub mod error;
pub mod file_patch;
pub mod state;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{EngineError, PatchError, ProtocolViolation, Result};
pub use state::{EngineUpdate, InterruptCoordinator, Snapshot, TurnPhase, TurnStatus};
