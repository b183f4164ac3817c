pub mod conversation;
pub mod reconcile;
pub mod tool_call;

pub use conversation::{
    EngineUpdate, FrameOutcome, InterruptCoordinator, PatchPreview, Snapshot, TurnPhase,
    TurnStatus,
};
pub use reconcile::{apply_frame, FrameFlow};
pub use tool_call::apply_tool_call_delta;
