use std::path::PathBuf;

use super::constants::*;
use super::types::{LlmProvider, LlmSettings, PipelineSettings, PlannerSettings, ToolchainSettings};

pub fn default_user_agent() -> String {
    format!("reel/{}", env!("CARGO_PKG_VERSION"))
}

pub fn default_workspace_dir() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".reel/workspace");
    path
}

impl Default for LlmSettings {
    fn default() -> Self {
        let provider = LlmProvider::OpenAi;
        Self {
            provider,
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: provider.default_base_url().to_string(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_PLANNER_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            context_tokens: DEFAULT_CONTEXT_TOKENS,
            temperature: 0.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            whisper: "whisper".to_string(),
            uploader: "biliup".to_string(),
        }
    }
}
