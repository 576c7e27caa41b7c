use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerMessage {
    pub role: Role,
    pub content: String,
    /// Capability that produced this turn; only set for `Role::Tool`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PlannerMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: Some(name.into()),
        }
    }
}

/// Sampling knobs forwarded to the backend; unset fields use provider defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Vec<String>,
}

/// One decision parsed from a planner reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    InvokeTool {
        tool_name: String,
        tool_input: String,
        reasoning: String,
    },
    Finish {
        result: String,
        reasoning: String,
    },
}

impl PlannedAction {
    pub fn reasoning(&self) -> &str {
        match self {
            PlannedAction::InvokeTool { reasoning, .. } => reasoning,
            PlannedAction::Finish { reasoning, .. } => reasoning,
        }
    }
}
