//! Chains sequence capability calls over one shared [`Agent`](crate::agent::Agent).
//!
//! [`PublishPipeline`] runs a fixed ingest-to-publish order; [`PlannerChain`]
//! lets the planner pick each step. Both return the steps that ran even when
//! they fail, through [`ExecutionFailure`].

mod base;
mod error;
mod pipeline;
mod planner_chain;
mod registry;
mod types;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use base::run_sequence;
pub use error::{ChainError, ErrorKind, ExecutionFailure};
pub use pipeline::{PIPELINE_CHAIN_NAME, PIPELINE_STEPS, PublishPipeline};
pub use planner_chain::{PLANNER_CHAIN_NAME, PlannerChain};
pub use registry::ChainRegistry;
pub use types::{ExecutionInput, ExecutionOutput, StepRecord, VIDEO_ID_KEY};

pub type ChainResult = Result<ExecutionOutput, ExecutionFailure>;

/// Receives each recorded step and the chain's progress percentage.
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(&StepRecord, f64) + Send);

#[async_trait]
pub trait Chain: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, cancel: &CancellationToken, input: &ExecutionInput) -> ChainResult;

    /// Like `execute`, reporting steps through `on_step`. The default reports
    /// once the run is over, with progress relative to the recorded steps.
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
        let total = steps.len().max(1) as f64;
        for (index, step) in steps.iter().enumerate() {
            on_step(step, (index + 1) as f64 / total * 100.0);
        }
        result
    }
}
