//! Configuration management for the reel workflow runner.
//!
//! Settings are resolved in layers:
//! - built-in defaults
//! - the JSON file at `~/.reel/config`
//! - environment variable overrides
//!
//! followed by validation of the required settings.

mod builder;
mod constants;
mod defaults;
mod environment;
mod loader;
mod types;
mod validation;

pub use builder::ConfigBuilder;
pub use constants::{
    DEFAULT_CONTEXT_TOKENS, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_TOKENS, DEFAULT_TARGET_LANG,
};
pub use types::{
    Config, LlmProvider, LlmSettings, PipelineSettings, PlannerSettings, ToolchainSettings,
};

#[cfg(test)]
mod tests;
