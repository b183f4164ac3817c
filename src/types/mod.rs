pub mod api;
mod frame;
mod interrupt;
mod message;

pub use api::{ResumeChoice, ResumeRequest, TurnRequest};
pub use frame::{Frame, InterruptFrame, TokenUsage, ToolCallDelta};
pub use interrupt::{InterruptDecision, Outcome, PendingInterrupt};
pub use message::{Invocation, Message, ParsedArguments, Role};
