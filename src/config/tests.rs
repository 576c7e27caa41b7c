use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

use crate::config::environment::{env_string, env_u32, env_u64};
use crate::config::{Config, DEFAULT_MAX_ITERATIONS, LlmProvider};

fn env_lock<'a>() -> std::sync::MutexGuard<'a, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

const MANAGED_VARS: &[&str] = &[
    "HOME",
    "REEL_PROVIDER",
    "REEL_LLM_BASE_URL",
    "OPENAI_API_KEY",
    "OPENROUTER_API_KEY",
    "DEEPSEEK_API_KEY",
    "REEL_TIMEOUT_SECS",
    "REEL_MODEL",
    "REEL_MAX_TOKENS",
    "REEL_CONTEXT_TOKENS",
    "REEL_MAX_ITERATIONS",
    "REEL_WORKSPACE",
    "REEL_TARGET_LANG",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    /// Clears every variable the loader reads, then applies `vars`.
    fn new(vars: &[(&str, &str)]) -> Self {
        let saved = MANAGED_VARS
            .iter()
            .map(|key| (key.to_string(), std::env::var(key).ok()))
            .collect::<Vec<_>>();
        for key in MANAGED_VARS {
            unsafe { std::env::remove_var(key) };
        }
        for (key, value) in vars {
            unsafe { std::env::set_var(key, value) };
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(val) => unsafe { std::env::set_var(key, val) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

fn write_config(home: &TempDir, contents: &str) {
    let config_dir = home.path().join(".reel");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config"), contents).unwrap();
}

#[test]
fn load_from_env_only() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();

    let _env = EnvGuard::new(&[
        ("HOME", home.as_str()),
        ("OPENAI_API_KEY", "env-key"),
        ("REEL_TIMEOUT_SECS", "45"),
        ("REEL_MAX_TOKENS", "4096"),
        ("REEL_CONTEXT_TOKENS", "32000"),
        ("REEL_MODEL", "env-planner"),
        ("REEL_MAX_ITERATIONS", "4"),
        ("REEL_TARGET_LANG", "ja"),
    ]);

    let config = Config::load().unwrap();
    assert_eq!(config.llm.provider, LlmProvider::OpenAi);
    assert_eq!(config.llm.api_key, "env-key");
    assert_eq!(config.llm.timeout_secs, 45);
    assert_eq!(config.planner.max_tokens, 4096);
    assert_eq!(config.planner.context_tokens, 32_000);
    assert_eq!(config.planner.model, "env-planner");
    assert_eq!(config.planner.max_iterations, 4);
    assert_eq!(config.pipeline.target_lang, "ja");
}

#[test]
fn load_prefers_env_over_file() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    write_config(
        &temp_home,
        r#"{
            "llm": { "api_key": "file-key", "timeout_secs": 20 },
            "planner": { "model": "file-planner", "max_tokens": 1024 },
            "pipeline": { "workspace_dir": "/data/reel", "max_retries": 5 },
            "toolchain": { "uploader": "custom-uploader" }
        }"#,
    );

    let _env = EnvGuard::new(&[
        ("HOME", home.as_str()),
        ("OPENAI_API_KEY", "env-key"),
        ("REEL_TIMEOUT_SECS", "40"),
        ("REEL_MODEL", "env-planner"),
    ]);

    let config = Config::load().unwrap();
    assert_eq!(config.llm.api_key, "env-key");
    assert_eq!(config.llm.timeout_secs, 40);
    assert_eq!(config.planner.max_tokens, 1024);
    assert_eq!(config.planner.model, "env-planner");
    assert_eq!(config.pipeline.workspace_dir, std::path::PathBuf::from("/data/reel"));
    assert_eq!(config.pipeline.max_retries, 5);
    assert_eq!(config.toolchain.uploader, "custom-uploader");
    assert_eq!(config.toolchain.ffmpeg, "ffmpeg");
    assert_eq!(config.planner.max_iterations, DEFAULT_MAX_ITERATIONS);
}

#[test]
fn load_errors_without_api_key() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();

    let _env = EnvGuard::new(&[("HOME", home.as_str())]);

    let err = Config::load().unwrap_err();
    assert!(err.to_string().contains("OPENAI_API_KEY"));

    let unvalidated = Config::load_unvalidated().unwrap();
    assert!(unvalidated.llm.api_key.is_empty());
}

#[test]
fn provider_switch_resets_base_url_and_key_source() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();

    let _env = EnvGuard::new(&[
        ("HOME", home.as_str()),
        ("REEL_PROVIDER", "deepseek"),
        ("OPENAI_API_KEY", "ignored"),
        ("DEEPSEEK_API_KEY", "deepseek-key"),
    ]);

    let config = Config::load().unwrap();
    assert_eq!(config.llm.provider, LlmProvider::DeepSeek);
    assert_eq!(config.llm.base_url, LlmProvider::DeepSeek.default_base_url());
    assert_eq!(config.llm.api_key, "deepseek-key");
}

#[test]
fn load_rejects_unknown_provider_in_file() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    write_config(&temp_home, r#"{ "llm": { "provider": "mystery" } }"#);

    let _env = EnvGuard::new(&[("HOME", home.as_str()), ("OPENAI_API_KEY", "k")]);

    let err = Config::load().unwrap_err();
    assert!(format!("{err:#}").contains("Unknown LLM provider 'mystery'"));
}

#[test]
fn validation_rejects_zero_iterations() {
    let config = Config::builder()
        .with_llm(|llm| llm.api_key = "key".to_string())
        .with_planner(|planner| planner.max_iterations = 0)
        .build()
        .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("max_iterations"));
}

#[test]
fn save_round_trips_through_load() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    let _env = EnvGuard::new(&[("HOME", home.as_str())]);

    let config = Config::builder()
        .with_llm(|llm| {
            llm.provider = LlmProvider::OpenRouter;
            llm.base_url = LlmProvider::OpenRouter.default_base_url().to_string();
            llm.api_key = "saved-key".to_string();
        })
        .with_pipeline(|pipeline| pipeline.target_lang = "ko".to_string())
        .build()
        .unwrap();
    config.save().unwrap();

    let loaded = Config::load().unwrap();
    assert_eq!(loaded.llm.provider, LlmProvider::OpenRouter);
    assert_eq!(loaded.llm.api_key, "saved-key");
    assert_eq!(loaded.pipeline.target_lang, "ko");
}

#[test]
fn validate_rejects_context_not_larger_than_completion() {
    let config = Config::builder()
        .with_llm(|llm| llm.api_key = "key".to_string())
        .with_planner(|planner| {
            planner.max_tokens = 4096;
            planner.context_tokens = 4096;
        })
        .build()
        .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("planner.context_tokens"));
}

#[test]
fn env_helpers_parse_values() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[
        ("REEL_MODEL", "model-x"),
        ("REEL_TIMEOUT_SECS", "12"),
        ("REEL_MAX_TOKENS", "not-a-number"),
    ]);

    assert_eq!(env_string("REEL_MODEL").unwrap().as_deref(), Some("model-x"));
    assert_eq!(env_u64("REEL_TIMEOUT_SECS").unwrap(), Some(12));
    assert!(env_u32("REEL_MAX_TOKENS").is_err());
    assert_eq!(env_string("REEL_WORKSPACE").unwrap(), None);
}
