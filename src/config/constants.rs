pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_CONTEXT_TOKENS: u32 = 128_000;
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_PLANNER_MODEL: &str = "gpt-4o";
pub const DEFAULT_TARGET_LANG: &str = "zh-CN";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
