use anyhow::Result;
use colored::Colorize;

use crate::chain::{ChainResult, PublishPipeline, StepRecord};

pub(crate) fn mask_api_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".to_string();
    }

    let visible: String = key.chars().take(8).collect();
    format!("{visible}***")
}

pub(crate) fn print_step(position: usize, step: &StepRecord) {
    if step.success {
        println!(
            "  ✅ {position}. {} → {}",
            step.tool_name.bold(),
            step.output.trim()
        );
    } else {
        println!(
            "  ❌ {position}. {}: {}",
            step.tool_name.bold(),
            step.error.as_deref().unwrap_or("failed").red()
        );
    }
}

/// Prints `result` as JSON or as a step list, then turns a failure into an error.
/// Progress is measured against the fixed pipeline length.
pub(crate) fn report(
    result: ChainResult,
    json: bool,
    show_progress: bool,
) -> Result<()> {
    let (output, failure) = match result {
        Ok(output) => (output, None),
        Err(failure) => {
            let output = failure.output.clone();
            (output, Some(failure))
        }
    };

    if json {
        println!("{}", output.to_json()?);
    } else {
        for (index, step) in output.steps.iter().enumerate() {
            print_step(index + 1, step);
        }
        if show_progress {
            println!(
                "  Progress: {:.1}%",
                PublishPipeline::progress(Some(&output))
            );
        }
    }

    match failure {
        Some(failure) => {
            eprintln!("{} [{}]", "❌ Chain failed".bold().red(), failure.kind());
            Err(failure.error.into())
        }
        None => {
            if !json {
                println!("{} {}", "✅ Result:".bold().green(), output.result);
            }
            Ok(())
        }
    }
}
