mod core;
mod state;
mod streaming;
mod tools;


pub use self::core::FrameOutcome;
pub use state::{
    EngineUpdate, InterruptCoordinator, PatchPreview, Snapshot, TurnPhase, TurnStatus,
};
pub use tools::{is_file_edit_tool, patch_instruction_from_parameters, FILE_EDIT_TOOLS};
