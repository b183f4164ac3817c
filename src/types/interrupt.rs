use super::api::ResumeChoice;
use super::frame::InterruptFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A backend request for approval that has not been answered yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInterrupt {
    pub id: String,
    pub tool_name: String,
    pub description: String,
    pub parameters: Value,
    pub is_direct_question: bool,
}

impl From<InterruptFrame> for PendingInterrupt {
    fn from(frame: InterruptFrame) -> Self {
        let is_direct_question = frame.question.is_some();
        Self {
            id: frame.id,
            tool_name: frame.tool_name,
            description: frame.question.unwrap_or(frame.description),
            parameters: frame.parameters,
            is_direct_question,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approve,
    Reject,
}

/// The user's answer to a pending interrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptDecision {
    pub outcome: Outcome,
    pub free_text: Option<String>,
}

impl InterruptDecision {
    pub fn approve() -> Self {
        Self {
            outcome: Outcome::Approve,
            free_text: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            outcome: Outcome::Reject,
            free_text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.free_text = Some(text.into());
        self
    }

    pub fn choice(&self) -> ResumeChoice {
        match self.outcome {
            Outcome::Approve => ResumeChoice::Approve,
            Outcome::Reject => ResumeChoice::Reject,
        }
    }
}
