use std::fmt;

use thiserror::Error;

use crate::capability::CapabilityError;
use crate::planner::{PlannerError, ProtocolError};

use super::types::ExecutionOutput;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("capabilities and inputs length mismatch: {capabilities} != {inputs}")]
    LengthMismatch { capabilities: usize, inputs: usize },

    #[error("{0} is required in metadata")]
    MissingParameter(&'static str),

    #[error("unknown step: {0}")]
    UnknownStep(String),

    #[error("unknown tool: {0}")]
    ToolNotFound(String),

    #[error("chain '{0}' not found")]
    ExecutorNotFound(String),

    #[error("chain failed at step {index} ({tool}): {source}")]
    StepFailed {
        index: usize,
        tool: String,
        #[source]
        source: CapabilityError,
    },

    #[error("planner chat failed at iteration {iteration}: {source}")]
    Planner {
        iteration: usize,
        #[source]
        source: PlannerError,
    },

    #[error("failed to parse planner response at iteration {iteration}: {source}")]
    Protocol {
        iteration: usize,
        #[source]
        source: ProtocolError,
    },

    #[error("reached maximum iterations ({0}) without completion")]
    IterationsExhausted(usize),

    #[error("chain failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: Box<ChainError>,
    },

    #[error("execution cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Protocol,
    Execution,
    Exhaustion,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Execution => "execution",
            ErrorKind::Exhaustion => "exhaustion",
            ErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::LengthMismatch { .. }
            | ChainError::MissingParameter(_)
            | ChainError::UnknownStep(_)
            | ChainError::ToolNotFound(_)
            | ChainError::ExecutorNotFound(_) => ErrorKind::Configuration,
            ChainError::Protocol { .. } => ErrorKind::Protocol,
            ChainError::StepFailed {
                source: CapabilityError::Cancelled,
                ..
            }
            | ChainError::Planner {
                source: PlannerError::Cancelled,
                ..
            }
            | ChainError::Cancelled => ErrorKind::Cancelled,
            ChainError::StepFailed { .. } | ChainError::Planner { .. } => ErrorKind::Execution,
            ChainError::IterationsExhausted(_) | ChainError::RetriesExhausted { .. } => {
                ErrorKind::Exhaustion
            }
        }
    }

    /// Only execution failures are worth another whole-pipeline attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Execution
    }
}

/// A failed run: the error plus whatever output accumulated before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ExecutionFailure {
    pub output: ExecutionOutput,
    #[source]
    pub error: ChainError,
}

impl ExecutionFailure {
    pub fn new(output: ExecutionOutput, error: ChainError) -> Self {
        Self { output, error }
    }

    /// Failure before any step ran.
    pub fn early(error: ChainError) -> Self {
        Self::new(ExecutionOutput::new(), error)
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl From<ChainError> for ExecutionFailure {
    fn from(error: ChainError) -> Self {
        Self::early(error)
    }
}
