use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use super::commands;

/// Entry point for the `reel` command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "reel",
    about = "Download, subtitle, translate and republish videos",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the fixed publish pipeline for one video.
    Run(RunArgs),
    /// Let the planner choose capabilities to complete a task.
    Agent(AgentArgs),
    /// Run any registered chain by name.
    Exec(ExecArgs),
    /// List registered chains.
    Chains,
    /// List capabilities and their input documentation.
    Tools,
    /// Send a prompt straight to the planner model.
    Chat(ChatArgs),
    /// Show or update the configuration file.
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Source video id.
    pub video_id: String,

    /// Total attempts for the full pipeline (defaults to pipeline.max_retries).
    #[arg(long)]
    pub retries: Option<usize>,

    /// Run only these steps, in this order (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub steps: Vec<String>,

    /// Print the execution output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AgentArgs {
    /// Video id the task refers to; appended to the query.
    #[arg(long)]
    pub video_id: Option<String>,

    /// Print the execution output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Task description in plain language.
    #[arg(required = true, trailing_var_arg = true)]
    pub query: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Registered chain name (see `reel chains`).
    pub chain: String,

    /// Video id passed to the chain as metadata.
    #[arg(long)]
    pub video_id: Option<String>,

    /// Print the execution output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Free-text query for chains that read one.
    #[arg(trailing_var_arg = true)]
    pub query: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Print chunks as they arrive.
    #[arg(long)]
    pub stream: bool,

    /// Optional override for max_tokens (defaults to planner.max_tokens).
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Optional temperature to pass through to the API.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Optional nucleus sampling value.
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Stop sequence; repeat for several.
    #[arg(long = "stop")]
    pub stop: Vec<String>,

    /// Prompt to send to the planner model.
    #[arg(required = true)]
    pub prompt: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Print the effective configuration without changing it.
    #[arg(long)]
    pub show: bool,

    /// Select the LLM provider (openai, openrouter or deepseek)
    #[arg(long)]
    pub provider: Option<String>,

    /// Set the API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Set the planner model
    #[arg(long)]
    pub model: Option<String>,

    /// Set timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Set the subtitle and metadata target language
    #[arg(long)]
    pub target_lang: Option<String>,

    /// Set the artifact workspace directory
    #[arg(long)]
    pub workspace: Option<PathBuf>,
}

impl ConfigArgs {
    pub(crate) fn has_updates(&self) -> bool {
        self.provider.is_some()
            || self.api_key.is_some()
            || self.model.is_some()
            || self.timeout.is_some()
            || self.target_lang.is_some()
            || self.workspace.is_some()
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        commands::run(self).await
    }
}
