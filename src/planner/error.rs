use thiserror::Error;

/// Failures talking to the planner backend.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("planner API error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("planner returned no choices")]
    NoChoices,

    #[error("planner response was empty")]
    EmptyResponse,

    #[error("failed to decode planner stream: {0}")]
    Decode(String),

    #[error("planner call cancelled")]
    Cancelled,
}

/// The planner's reply did not match the action protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("planner response did not contain a JSON object")]
    NoJson,

    #[error("failed to parse planner action: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },

    #[error("unrecognized planner action type '{0}'")]
    UnknownKind(String),

    #[error("planner action '{kind}' is missing required field '{field}'")]
    MissingField { kind: &'static str, field: &'static str },
}
