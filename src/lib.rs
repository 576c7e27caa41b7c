pub mod agent;
pub mod capability;
pub mod chain;
pub mod cli;
pub mod client;
pub mod config;
pub mod exec;
pub mod planner;
pub mod runtime;
pub mod tokens;
