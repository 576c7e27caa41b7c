use anyhow::{Result, anyhow, bail};

use super::types::Config;

pub fn validate(config: &Config) -> Result<()> {
    if config.llm.api_key.trim().is_empty() {
        let provider = config.llm.provider;
        return Err(anyhow!(
            "{} API key not found. Set {} or add it to {}",
            provider.display_name(),
            provider.api_key_env_var(),
            Config::config_path()?.display()
        ));
    }

    if config.planner.max_tokens == 0 {
        bail!("planner.max_tokens must be greater than zero");
    }

    if config.planner.context_tokens <= config.planner.max_tokens {
        bail!(
            "planner.context_tokens ({}) must exceed planner.max_tokens ({})",
            config.planner.context_tokens,
            config.planner.max_tokens
        );
    }

    if config.planner.max_iterations == 0 {
        bail!("planner.max_iterations must be greater than zero");
    }

    if config.pipeline.target_lang.trim().is_empty() {
        bail!("pipeline.target_lang cannot be empty");
    }

    Ok(())
}
