use anyhow::Result;

use crate::config::{Config, LlmProvider};

use super::args::ConfigArgs;
use super::util::mask_api_key;

pub(crate) fn handle_config(args: ConfigArgs) -> Result<()> {
    let mut config = Config::load_unvalidated()?;

    if args.has_updates() {
        apply_updates(&args, &mut config)?;
        config.validate()?;
        config.save()?;
        println!(
            "✅ Configuration saved to {}",
            Config::config_path()?.display()
        );
    } else if !args.show {
        println!("No changes requested; showing the effective configuration.");
    }

    print_config(&config);
    Ok(())
}

fn apply_updates(args: &ConfigArgs, config: &mut Config) -> Result<()> {
    if let Some(ref provider) = args.provider {
        let provider: LlmProvider = provider.trim().parse()?;
        if provider != config.llm.provider {
            config.llm.provider = provider;
            config.llm.base_url = provider.default_base_url().to_string();
        }
    }

    if let Some(ref api_key) = args.api_key {
        config.llm.api_key = api_key.clone();
    }

    if let Some(ref model) = args.model {
        config.planner.model = model.clone();
    }

    if let Some(timeout) = args.timeout {
        config.llm.timeout_secs = timeout;
    }

    if let Some(ref target_lang) = args.target_lang {
        config.pipeline.target_lang = target_lang.clone();
    }

    if let Some(ref workspace) = args.workspace {
        config.pipeline.workspace_dir = workspace.clone();
    }

    Ok(())
}

fn print_config(config: &Config) {
    println!("📋 Current configuration:");
    println!("   Provider: {}", config.llm.provider.display_name());
    println!("   Base URL: {}", config.llm.base_url);
    println!("   API Key: {}", mask_api_key(&config.llm.api_key));
    println!("   Timeout: {}s", config.llm.timeout_secs);
    println!("   Planner Model: {}", config.planner.model);
    println!("   Max Completion Tokens: {}", config.planner.max_tokens);
    println!("   Context Tokens: {}", config.planner.context_tokens);
    println!("   Max Iterations: {}", config.planner.max_iterations);
    println!("   Workspace: {}", config.pipeline.workspace_dir.display());
    println!("   Target Language: {}", config.pipeline.target_lang);
    println!("   Max Retries: {}", config.pipeline.max_retries);
    println!(
        "   Toolchain: {}, {}, {}, {}",
        config.toolchain.yt_dlp,
        config.toolchain.ffmpeg,
        config.toolchain.whisper,
        config.toolchain.uploader
    );
}
