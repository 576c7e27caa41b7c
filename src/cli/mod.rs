mod agent_cmd;
mod args;
mod chat;
mod commands;
mod config_cmd;
mod pipeline_cmd;
mod util;

pub use args::Cli;
