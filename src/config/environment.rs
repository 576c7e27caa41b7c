use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;

use super::builder::ConfigBuilder;
use super::types::LlmProvider;

pub fn apply_env_overrides(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Some(provider_raw) = env_string("REEL_PROVIDER")? {
        let provider = provider_raw
            .parse::<LlmProvider>()
            .with_context(|| format!("Failed to parse REEL_PROVIDER value '{provider_raw}'"))?;
        builder = builder.with_llm(|llm| {
            if llm.provider != provider {
                llm.provider = provider;
                llm.base_url = provider.default_base_url().to_string();
            }
        });
    }

    if let Some(base_url) = env_string("REEL_LLM_BASE_URL")? {
        builder = builder.with_llm(|llm| llm.base_url = base_url);
    }

    for provider in [
        LlmProvider::OpenAi,
        LlmProvider::OpenRouter,
        LlmProvider::DeepSeek,
    ] {
        if let Some(api_key) = env_string(provider.api_key_env_var())? {
            builder = builder.with_llm(|llm| {
                if llm.provider == provider {
                    llm.api_key = api_key;
                }
            });
        }
    }

    if let Some(timeout) = env_u64("REEL_TIMEOUT_SECS")? {
        builder = builder.with_llm(|llm| llm.timeout_secs = timeout);
    }

    if let Some(model) = env_string("REEL_MODEL")? {
        builder = builder.with_planner(|planner| planner.model = model);
    }

    if let Some(max_tokens) = env_u32("REEL_MAX_TOKENS")? {
        builder = builder.with_planner(|planner| planner.max_tokens = max_tokens);
    }

    if let Some(context_tokens) = env_u32("REEL_CONTEXT_TOKENS")? {
        builder = builder.with_planner(|planner| planner.context_tokens = context_tokens);
    }

    if let Some(max_iterations) = env_u64("REEL_MAX_ITERATIONS")? {
        builder = builder.with_planner(|planner| planner.max_iterations = max_iterations as usize);
    }

    if let Some(workspace) = env_string("REEL_WORKSPACE")? {
        builder =
            builder.with_pipeline(|pipeline| pipeline.workspace_dir = PathBuf::from(workspace));
    }

    if let Some(target_lang) = env_string("REEL_TARGET_LANG")? {
        builder = builder.with_pipeline(|pipeline| pipeline.target_lang = target_lang);
    }

    Ok(builder)
}

pub fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(anyhow!("{key} contains invalid UTF-8")),
    }
}

pub fn env_u64(key: &str) -> Result<Option<u64>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key} as u64"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}

pub fn env_u32(key: &str) -> Result<Option<u32>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .parse::<u32>()
            .with_context(|| format!("Failed to parse {key} as u32"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}
