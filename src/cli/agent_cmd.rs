use anyhow::{Result, bail};
use colored::Colorize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::capability::validate_content_id;
use crate::chain::{ExecutionInput, PLANNER_CHAIN_NAME, StepRecord, VIDEO_ID_KEY};
use crate::runtime::Runtime;

use super::args::{AgentArgs, ExecArgs};
use super::util::report;

pub(crate) async fn handle_agent(
    args: AgentArgs,
    runtime: &Runtime,
    cancel: &CancellationToken,
) -> Result<()> {
    let query = args.query.join(" ").trim().to_owned();
    if query.is_empty() {
        bail!("Query cannot be empty. Usage: reel agent \"your task\"");
    }

    if !args.json {
        println!(
            "🤖 Planning with up to {} iterations",
            runtime.agent().max_iterations()
        );
    }

    let input = build_input(query, args.video_id)?;
    execute_registered(runtime, cancel, PLANNER_CHAIN_NAME, &input, args.json).await
}

pub(crate) async fn handle_exec(
    args: ExecArgs,
    runtime: &Runtime,
    cancel: &CancellationToken,
) -> Result<()> {
    let query = args.query.join(" ").trim().to_owned();
    if !args.json {
        println!("⛓️  Running chain {}", args.chain.bold());
    }

    let input = build_input(query, args.video_id)?;
    execute_registered(runtime, cancel, &args.chain, &input, args.json).await
}

fn build_input(mut query: String, video_id: Option<String>) -> Result<ExecutionInput> {
    let mut input = ExecutionInput::default();
    if let Some(video_id) = video_id {
        validate_content_id(&video_id)?;
        if !query.is_empty() {
            query.push_str("\n\n");
        }
        query.push_str(&format!("Video id: {video_id}"));
        input = input.with_metadata(VIDEO_ID_KEY, Value::String(video_id));
    }
    input.query = query;
    Ok(input)
}

/// Looks `name` up in the chain registry and runs it, printing steps as they
/// are reported.
async fn execute_registered(
    runtime: &Runtime,
    cancel: &CancellationToken,
    name: &str,
    input: &ExecutionInput,
    json: bool,
) -> Result<()> {
    let chain = runtime.chains().get(name)?;

    let mut on_step = |step: &StepRecord, progress: f64| {
        if json {
            return;
        }
        let marker = if step.success { "✅" } else { "⚠️ " };
        println!("  {marker} {} [{progress:.0}%]", step.tool_name.bold());
    };
    let result = chain.execute_with_progress(cancel, input, &mut on_step).await;

    report(result, json, false)
}
