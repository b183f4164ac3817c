use super::frame::TokenUsage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub invocations: Vec<Invocation>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::User, content)
    }

    pub fn assistant(id: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, String::new())
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let call_id = call_id.into();
        let mut message = Self::new(call_id.clone(), Role::Tool, content);
        message.tool_call_id = Some(call_id);
        message
    }

    /// An assistant-role entry describing a failed stream.
    pub fn error(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut message = Self::new(id, Role::Assistant, text);
        message.is_error = true;
        message
    }

    fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            invocations: Vec::new(),
            usage: None,
            is_error: false,
            tool_call_id: None,
        }
    }
}

/// A single tool call being assembled from argument fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub position: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub raw_arguments: String,
    pub parsed_arguments: ParsedArguments,
}

impl Invocation {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            id: None,
            name: None,
            raw_arguments: String::new(),
            parsed_arguments: ParsedArguments::Loading {
                partial: String::new(),
                preview: None,
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        self.parsed_arguments.is_loading()
    }

    /// Best available argument object: the complete value, else the
    /// speculative preview.
    pub fn arguments(&self) -> Option<&Value> {
        match &self.parsed_arguments {
            ParsedArguments::Complete(value) => Some(value),
            ParsedArguments::Loading { preview, .. } => preview.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ParsedArguments {
    Complete(Value),
    /// `partial` is the raw text as received; `preview` is a speculative
    /// completion for display only.
    Loading {
        partial: String,
        preview: Option<Value>,
    },
}

impl ParsedArguments {
    pub fn is_loading(&self) -> bool {
        matches!(self, ParsedArguments::Loading { .. })
    }
}
