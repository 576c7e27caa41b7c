use anyhow::Result;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::capability::validate_content_id;
use crate::chain::ExecutionInput;
use crate::runtime::Runtime;

use super::args::RunArgs;
use super::util::report;

pub(crate) async fn handle_run(
    args: RunArgs,
    runtime: &Runtime,
    cancel: &CancellationToken,
) -> Result<()> {
    validate_content_id(&args.video_id)?;

    let pipeline = runtime.pipeline();
    let input = ExecutionInput::for_video(&args.video_id);

    let result = if args.steps.is_empty() {
        let attempts = args
            .retries
            .unwrap_or(runtime.config().pipeline.max_retries);
        if !args.json {
            println!(
                "🎬 Publishing {} (up to {attempts} attempt(s))",
                args.video_id.bold()
            );
        }
        pipeline.execute_with_retry(cancel, &input, attempts).await
    } else {
        if !args.json {
            println!(
                "🎬 Running {} for {}",
                args.steps.join(" → ").bold(),
                args.video_id.bold()
            );
        }
        pipeline.partial_execute(cancel, &input, &args.steps).await
    };

    report(result, args.json, true)
}
