use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key carrying the video id for the deterministic pipeline.
pub const VIDEO_ID_KEY: &str = "video_id";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInput {
    /// Natural-language task; read by planner-driven chains only.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ExecutionInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            metadata: Map::new(),
        }
    }

    pub fn for_video(video_id: impl Into<String>) -> Self {
        Self::default().with_metadata(VIDEO_ID_KEY, Value::String(video_id.into()))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Non-empty string value for `key`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// One capability invocation. Failures keep the message, not the error value,
/// so records serialise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub tool_name: String,
    pub input: String,
    #[serde(default)]
    pub output: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    pub fn succeeded(
        tool_name: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            input: input.into(),
            output: output.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(
        tool_name: impl Into<String>,
        input: impl Into<String>,
        error: &dyn fmt::Display,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            input: input.into(),
            output: String::new(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ExecutionOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `step`; a successful step also snapshots its output under `<tool>_result`.
    pub fn record(&mut self, step: StepRecord) {
        if step.success {
            self.metadata.insert(
                format!("{}_result", step.tool_name),
                Value::String(step.output.clone()),
            );
        }
        self.steps.push(step);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
