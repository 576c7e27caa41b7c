use anyhow::{Context, Result};
use dirs::home_dir;
use std::{fs, path::Path};

use super::Config;
use super::builder::ConfigBuilder;
use super::environment::apply_env_overrides;
use super::types::{FileConfig, PersistedConfig};
use super::validation::validate;

impl Config {
    pub fn config_path() -> Result<std::path::PathBuf> {
        let mut path = home_dir().context("Could not determine home directory")?;
        path.push(".reel/config");
        Ok(path)
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn load() -> Result<Self> {
        let config = Self::load_unvalidated()?;
        validate(&config)?;
        Ok(config)
    }

    /// Layers file and environment over the defaults without validating, so
    /// an incomplete configuration can still be inspected and edited.
    pub fn load_unvalidated() -> Result<Self> {
        let path = Self::config_path()?;
        let mut builder = ConfigBuilder::new();

        if path.exists() {
            builder = Self::apply_file(builder, &path)?;
        }

        builder = apply_env_overrides(builder)?;
        builder.build()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let payload = PersistedConfig::from(self);
        let json = serde_json::to_string_pretty(&payload)
            .context("Failed to serialize configuration to JSON")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate(self)
    }

    fn apply_file(builder: ConfigBuilder, path: &Path) -> Result<ConfigBuilder> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed reading config at {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(builder);
        }

        let raw: FileConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed parsing JSON config at {}", path.display()))?;

        raw.apply(builder)
    }
}

impl FileConfig {
    pub fn apply(self, mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
        if let Some(llm_file) = self.llm {
            let provider = llm_file
                .provider
                .as_deref()
                .map(str::parse::<super::types::LlmProvider>)
                .transpose()
                .context("Invalid llm.provider in config file")?;

            builder = builder.with_llm(|llm| {
                if let Some(parsed) = provider {
                    if llm.provider != parsed {
                        llm.provider = parsed;
                        llm.base_url = parsed.default_base_url().to_string();
                    }
                }
                if let Some(api_key) = llm_file.api_key {
                    llm.api_key = api_key;
                }
                if let Some(timeout) = llm_file.timeout_secs {
                    llm.timeout_secs = timeout;
                }
                if let Some(base_url) = llm_file.base_url {
                    llm.base_url = base_url;
                }
                if let Some(user_agent) = llm_file.user_agent {
                    llm.user_agent = user_agent;
                }
            });
        }

        if let Some(planner_file) = self.planner {
            builder = builder.with_planner(|planner| {
                if let Some(model) = planner_file.model {
                    planner.model = model;
                }
                if let Some(max_tokens) = planner_file.max_tokens {
                    planner.max_tokens = max_tokens;
                }
                if let Some(context_tokens) = planner_file.context_tokens {
                    planner.context_tokens = context_tokens;
                }
                if let Some(temperature) = planner_file.temperature {
                    planner.temperature = temperature;
                }
                if let Some(max_iterations) = planner_file.max_iterations {
                    planner.max_iterations = max_iterations;
                }
            });
        }

        if let Some(pipeline_file) = self.pipeline {
            builder = builder.with_pipeline(|pipeline| {
                if let Some(workspace_dir) = pipeline_file.workspace_dir {
                    pipeline.workspace_dir = workspace_dir;
                }
                if let Some(target_lang) = pipeline_file.target_lang {
                    pipeline.target_lang = target_lang;
                }
                if let Some(max_retries) = pipeline_file.max_retries {
                    pipeline.max_retries = max_retries;
                }
            });
        }

        if let Some(toolchain_file) = self.toolchain {
            builder = builder.with_toolchain(|toolchain| {
                if let Some(yt_dlp) = toolchain_file.yt_dlp {
                    toolchain.yt_dlp = yt_dlp;
                }
                if let Some(ffmpeg) = toolchain_file.ffmpeg {
                    toolchain.ffmpeg = ffmpeg;
                }
                if let Some(whisper) = toolchain_file.whisper {
                    toolchain.whisper = whisper;
                }
                if let Some(uploader) = toolchain_file.uploader {
                    toolchain.uploader = uploader;
                }
            });
        }

        Ok(builder)
    }
}
