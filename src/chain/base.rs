use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::capability::Capability;

use super::ChainResult;
use super::error::{ChainError, ExecutionFailure};
use super::types::{ExecutionOutput, StepRecord};

/// Calls `units[i]` with `inputs[i]` in order and stops at the first failure.
///
/// Every attempt is recorded, including the failing one. On success the
/// result is the last unit's output.
pub async fn run_sequence(
    cancel: &CancellationToken,
    chain: &str,
    units: &[Arc<dyn Capability>],
    inputs: &[String],
) -> ChainResult {
    if units.len() != inputs.len() {
        return Err(ExecutionFailure::early(ChainError::LengthMismatch {
            capabilities: units.len(),
            inputs: inputs.len(),
        }));
    }

    let total = units.len();
    let mut output = ExecutionOutput::new();
    let mut last_output = String::new();

    for (position, (unit, input)) in units.iter().zip(inputs).enumerate() {
        let step = position + 1;
        if cancel.is_cancelled() {
            return Err(ExecutionFailure::new(output, ChainError::Cancelled));
        }

        info!(chain, tool = unit.name(), step, total, "Executing tool");

        match unit.call(cancel, input).await {
            Ok(result) => {
                output.record(StepRecord::succeeded(unit.name(), input.as_str(), result.as_str()));
                last_output = result;
            }
            Err(source) => {
                error!(chain, tool = unit.name(), step, error = %source, "Tool execution failed");
                output.record(StepRecord::failed(unit.name(), input.as_str(), &source));
                return Err(ExecutionFailure::new(
                    output,
                    ChainError::StepFailed {
                        index: step,
                        tool: unit.name().to_string(),
                        source,
                    },
                ));
            }
        }
    }

    output.result = last_output;
    Ok(output)
}
