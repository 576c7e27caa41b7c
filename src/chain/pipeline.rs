use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::capability::Capability;
use crate::capability::builtin::{
    DOWNLOAD_THUMBNAIL, DOWNLOAD_VIDEO, EXTRACT_AUDIO, GENERATE_METADATA, GENERATE_SUBTITLE,
    TRANSLATE_SUBTITLE, UPLOAD_VIDEO,
};

use super::base::run_sequence;
use super::error::{ChainError, ExecutionFailure};
use super::types::{ExecutionInput, ExecutionOutput, VIDEO_ID_KEY};
use super::{Chain, ChainResult, ProgressCallback};

pub const PIPELINE_CHAIN_NAME: &str = "publish_pipeline";

/// Fixed step order. Later steps read artifacts earlier steps wrote, so the
/// order is what makes the pipeline correct.
pub const PIPELINE_STEPS: [&str; 7] = [
    DOWNLOAD_VIDEO,
    DOWNLOAD_THUMBNAIL,
    EXTRACT_AUDIO,
    GENERATE_SUBTITLE,
    TRANSLATE_SUBTITLE,
    GENERATE_METADATA,
    UPLOAD_VIDEO,
];

/// Deterministic ingest-to-publish chain over the agent's capabilities.
pub struct PublishPipeline {
    agent: Arc<Agent>,
    target_lang: String,
}

impl PublishPipeline {
    pub fn new(agent: Arc<Agent>, target_lang: impl Into<String>) -> Self {
        Self {
            agent,
            target_lang: target_lang.into(),
        }
    }

    /// Runs all steps once with up to `max_retries` total attempts. Each attempt
    /// starts from the first step. Configuration and cancellation failures are
    /// returned without retrying.
    pub async fn execute_with_retry(
        &self,
        cancel: &CancellationToken,
        input: &ExecutionInput,
        max_retries: usize,
    ) -> ChainResult {
        let attempts = max_retries.max(1);
        let mut last_failure = None;

        for attempt in 1..=attempts {
            info!(attempt, max_retries = attempts, "Attempting chain execution");

            match self.execute(cancel, input).await {
                Ok(output) => return Ok(output),
                Err(failure) if !failure.error.is_retryable() => return Err(failure),
                Err(failure) => {
                    warn!(attempt, error = %failure.error, "Chain execution failed, will retry");
                    last_failure = Some(failure);
                }
            }
        }

        match last_failure {
            Some(failure) => Err(ExecutionFailure::new(
                failure.output,
                ChainError::RetriesExhausted {
                    attempts,
                    source: Box::new(failure.error),
                },
            )),
            // `attempts` is at least one, so a failure was recorded.
            None => Err(ExecutionFailure::early(ChainError::Cancelled)),
        }
    }

    /// Runs only `steps`, in the given order, with the same per-step input the
    /// full pipeline would pass. Every name is resolved before anything runs.
    pub async fn partial_execute<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        input: &ExecutionInput,
        steps: &[S],
    ) -> ChainResult {
        let video_id = video_id(input)?;

        let mut units = Vec::with_capacity(steps.len());
        let mut inputs = Vec::with_capacity(steps.len());
        for step in steps {
            let step = step.as_ref();
            if !PIPELINE_STEPS.contains(&step) {
                return Err(ChainError::UnknownStep(step.to_string()).into());
            }
            units.push(self.resolve(step)?);
            inputs.push(self.step_input(step, video_id));
        }

        info!(video_id, steps = units.len(), "Starting partial pipeline");
        run_sequence(cancel, PIPELINE_CHAIN_NAME, &units, &inputs).await
    }

    /// Share of the fixed steps recorded in `output`, as a percentage.
    pub fn progress(output: Option<&ExecutionOutput>) -> f64 {
        match output {
            Some(output) => output.steps.len() as f64 / PIPELINE_STEPS.len() as f64 * 100.0,
            None => 0.0,
        }
    }

    fn resolve(&self, step: &str) -> Result<Arc<dyn Capability>, ExecutionFailure> {
        self.agent.capability(step).map_err(ExecutionFailure::early)
    }

    fn step_input(&self, step: &str, video_id: &str) -> String {
        if step == TRANSLATE_SUBTITLE {
            json!({ "video_id": video_id, "target_lang": self.target_lang }).to_string()
        } else {
            video_id.to_string()
        }
    }
}

#[async_trait]
impl Chain for PublishPipeline {
    fn name(&self) -> &str {
        PIPELINE_CHAIN_NAME
    }

    async fn execute(&self, cancel: &CancellationToken, input: &ExecutionInput) -> ChainResult {
        let video_id = video_id(input)?;

        let units = PIPELINE_STEPS
            .iter()
            .map(|step| self.resolve(step))
            .collect::<Result<Vec<_>, _>>()?;
        let inputs: Vec<String> = PIPELINE_STEPS
            .iter()
            .map(|step| self.step_input(step, video_id))
            .collect();

        info!(video_id, "Starting publish pipeline");
        let output = run_sequence(cancel, PIPELINE_CHAIN_NAME, &units, &inputs).await?;
        info!(video_id, result = %output.result, "Publish pipeline completed");
        Ok(output)
    }

    async fn execute_with_progress(
        &self,
        cancel: &CancellationToken,
        input: &ExecutionInput,
        on_step: ProgressCallback<'_>,
    ) -> ChainResult {
        let result = self.execute(cancel, input).await;
        let steps = match &result {
            Ok(output) => &output.steps,
            Err(failure) => &failure.output.steps,
        };
        for (index, step) in steps.iter().enumerate() {
            on_step(step, (index + 1) as f64 / PIPELINE_STEPS.len() as f64 * 100.0);
        }
        result
    }
}

fn video_id(input: &ExecutionInput) -> Result<&str, ExecutionFailure> {
    input
        .metadata_str(VIDEO_ID_KEY)
        .ok_or_else(|| ChainError::MissingParameter(VIDEO_ID_KEY).into())
}
