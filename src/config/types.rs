use anyhow::anyhow;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_DEEPSEEK_BASE_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENROUTER_BASE_URL,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub planner: PlannerSettings,
    pub pipeline: PipelineSettings,
    pub toolchain: ToolchainSettings,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: String,
    pub timeout_secs: u64,
    pub base_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LlmProvider {
    OpenAi,
    OpenRouter,
    DeepSeek,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenAi => write!(f, "openai"),
            LlmProvider::OpenRouter => write!(f, "openrouter"),
            LlmProvider::DeepSeek => write!(f, "deepseek"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(LlmProvider::OpenAi),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            "deepseek" => Ok(LlmProvider::DeepSeek),
            other => Err(anyhow!("Unknown LLM provider '{other}'")),
        }
    }
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => DEFAULT_OPENAI_BASE_URL,
            LlmProvider::OpenRouter => DEFAULT_OPENROUTER_BASE_URL,
            LlmProvider::DeepSeek => DEFAULT_DEEPSEEK_BASE_URL,
        }
    }

    pub fn api_key_env_var(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
            LlmProvider::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::OpenRouter => "OpenRouter",
            LlmProvider::DeepSeek => "DeepSeek",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub model: String,
    /// Upper bound on completion tokens per request.
    pub max_tokens: u32,
    /// Model context window; the completion is also kept inside it.
    pub context_tokens: u32,
    pub temperature: f32,
    pub max_iterations: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workspace_dir: PathBuf,
    pub target_lang: String,
    pub max_retries: usize,
}

/// Program names for the external tools the built-in capabilities drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSettings {
    pub yt_dlp: String,
    pub ffmpeg: String,
    pub whisper: String,
    pub uploader: String,
}

// File configuration types
#[derive(Debug, Default, Deserialize)]
pub(super) struct FileConfig {
    #[serde(default)]
    pub llm: Option<FileLlmSettings>,
    #[serde(default)]
    pub planner: Option<FilePlannerSettings>,
    #[serde(default)]
    pub pipeline: Option<FilePipelineSettings>,
    #[serde(default)]
    pub toolchain: Option<FileToolchainSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FileLlmSettings {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FilePlannerSettings {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub context_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FilePipelineSettings {
    pub workspace_dir: Option<PathBuf>,
    pub target_lang: Option<String>,
    pub max_retries: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FileToolchainSettings {
    pub yt_dlp: Option<String>,
    pub ffmpeg: Option<String>,
    pub whisper: Option<String>,
    pub uploader: Option<String>,
}

// Serialization helpers
#[derive(Serialize)]
pub(super) struct PersistedConfig<'a> {
    pub llm: PersistedLlm<'a>,
    pub planner: PersistedPlanner<'a>,
    pub pipeline: PersistedPipeline<'a>,
    pub toolchain: PersistedToolchain<'a>,
}

#[derive(Serialize)]
pub(super) struct PersistedLlm<'a> {
    pub provider: LlmProvider,
    pub api_key: &'a str,
    pub timeout_secs: u64,
    pub base_url: &'a str,
    pub user_agent: &'a str,
}

#[derive(Serialize)]
pub(super) struct PersistedPlanner<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub context_tokens: u32,
    pub temperature: f32,
    pub max_iterations: usize,
}

#[derive(Serialize)]
pub(super) struct PersistedPipeline<'a> {
    pub workspace_dir: &'a std::path::Path,
    pub target_lang: &'a str,
    pub max_retries: usize,
}

#[derive(Serialize)]
pub(super) struct PersistedToolchain<'a> {
    pub yt_dlp: &'a str,
    pub ffmpeg: &'a str,
    pub whisper: &'a str,
    pub uploader: &'a str,
}

impl<'a> From<&'a Config> for PersistedConfig<'a> {
    fn from(config: &'a Config) -> Self {
        PersistedConfig {
            llm: PersistedLlm {
                provider: config.llm.provider,
                api_key: &config.llm.api_key,
                timeout_secs: config.llm.timeout_secs,
                base_url: &config.llm.base_url,
                user_agent: &config.llm.user_agent,
            },
            planner: PersistedPlanner {
                model: &config.planner.model,
                max_tokens: config.planner.max_tokens,
                context_tokens: config.planner.context_tokens,
                temperature: config.planner.temperature,
                max_iterations: config.planner.max_iterations,
            },
            pipeline: PersistedPipeline {
                workspace_dir: &config.pipeline.workspace_dir,
                target_lang: &config.pipeline.target_lang,
                max_retries: config.pipeline.max_retries,
            },
            toolchain: PersistedToolchain {
                yt_dlp: &config.toolchain.yt_dlp,
                ffmpeg: &config.toolchain.ffmpeg,
                whisper: &config.toolchain.whisper,
                uploader: &config.toolchain.uploader,
            },
        }
    }
}
