use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::capability::CapabilityError;
use crate::planner::{PlannedAction, PlannerMessage, parse_action, render_system_prompt};

use super::error::{ChainError, ExecutionFailure};
use super::types::{ExecutionInput, ExecutionOutput, StepRecord};
use super::{Chain, ChainResult, ProgressCallback};

pub const PLANNER_CHAIN_NAME: &str = "agent";

/// Plan/act loop: the planner picks one capability per iteration until it
/// finishes or the agent's iteration cap runs out.
pub struct PlannerChain {
    agent: Arc<Agent>,
}

impl PlannerChain {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// Same loop as `execute`, calling `callback` after each tool step with the
    /// step and `iteration / max_iterations * 100`. The callback runs inline.
    pub async fn execute_with_callback<F>(
        &self,
        cancel: &CancellationToken,
        input: &ExecutionInput,
        mut callback: F,
    ) -> ChainResult
    where
        F: FnMut(&StepRecord, f64) + Send,
    {
        let callback: ProgressCallback<'_> = &mut callback;
        self.run(cancel, input, Some(callback)).await
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        input: &ExecutionInput,
        mut callback: Option<ProgressCallback<'_>>,
    ) -> ChainResult {
        let max_iterations = self.agent.max_iterations();
        let planner = self.agent.planner();
        info!(query = %input.query, max_iterations, "Starting planner chain");

        let mut output = ExecutionOutput::new();
        let mut messages = vec![
            PlannerMessage::system(render_system_prompt(self.agent.capabilities())),
            PlannerMessage::user(input.query.clone()),
        ];

        for iteration in 1..=max_iterations {
            if cancel.is_cancelled() {
                return Err(ExecutionFailure::new(output, ChainError::Cancelled));
            }
            debug!(iteration, max = max_iterations, "Planner iteration");

            let response = match planner.chat(cancel, &messages).await {
                Ok(response) => response,
                Err(source) => {
                    return Err(ExecutionFailure::new(
                        output,
                        ChainError::Planner { iteration, source },
                    ));
                }
            };

            let action = match parse_action(&response) {
                Ok(action) => action,
                Err(source) => {
                    return Err(ExecutionFailure::new(
                        output,
                        ChainError::Protocol { iteration, source },
                    ));
                }
            };

            debug!(iteration, reasoning = %action.reasoning(), "Planner action parsed");
            let (tool_name, tool_input) = match action {
                PlannedAction::Finish { result, .. } => {
                    info!(iterations = iteration, result = %result, "Planner chain completed");
                    output.result = result;
                    return Ok(output);
                }
                PlannedAction::InvokeTool {
                    tool_name,
                    tool_input,
                    ..
                } => (tool_name, tool_input),
            };

            let capability = match self.agent.capability(&tool_name) {
                Ok(capability) => capability,
                Err(error) => return Err(ExecutionFailure::new(output, error)),
            };

            info!(tool = %tool_name, input = %tool_input, "Agent calling tool");
            let (step, observation) = match capability.call(cancel, &tool_input).await {
                Ok(result) => {
                    let step = StepRecord::succeeded(&tool_name, &tool_input, &result);
                    (step, result)
                }
                Err(CapabilityError::Cancelled) => {
                    output.record(StepRecord::failed(
                        &tool_name,
                        &tool_input,
                        &CapabilityError::Cancelled,
                    ));
                    return Err(ExecutionFailure::new(output, ChainError::Cancelled));
                }
                Err(err) => {
                    warn!(tool = %tool_name, error = %err, "Tool failed; reporting to planner");
                    let observation = format!("Error: {err}");
                    (StepRecord::failed(&tool_name, &tool_input, &err), observation)
                }
            };

            if let Some(callback) = callback.as_mut() {
                callback(&step, iteration as f64 / max_iterations as f64 * 100.0);
            }
            output.record(step);

            messages.push(PlannerMessage::assistant(response));
            messages.push(PlannerMessage::tool(tool_name, observation));
        }

        warn!(max_iterations, "Planner chain exhausted its iterations");
        Err(ExecutionFailure::new(
            output,
            ChainError::IterationsExhausted(max_iterations),
        ))
    }
}

#[async_trait]
impl Chain for PlannerChain {
    fn name(&self) -> &str {
        PLANNER_CHAIN_NAME
    }

    async fn execute(&self, cancel: &CancellationToken, input: &ExecutionInput) -> ChainResult {
        self.run(cancel, input, None).await
    }

    async fn execute_with_progress(
        &self,
        cancel: &CancellationToken,
        input: &ExecutionInput,
        on_step: ProgressCallback<'_>,
    ) -> ChainResult {
        self.run(cancel, input, Some(on_step)).await
    }
}
