use thiserror::Error;

use crate::planner::PlannerError;

/// Error type for capability calls.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing artifact: {0}")]
    MissingArtifact(String),

    #[error("command `{program}` failed{}: {stderr}", exit_suffix(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("planner error: {0}")]
    Planner(#[from] PlannerError),

    #[error("cancelled")]
    Cancelled,
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => " (terminated by signal)".to_string(),
    }
}
