use anyhow::Result;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::runtime::Runtime;

use super::args::{Cli, Command};
use super::agent_cmd;
use super::chat;
use super::config_cmd;
use super::pipeline_cmd;

pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Config(args) => config_cmd::handle_config(args),
        Command::Chains => {
            let runtime = load_runtime()?;
            list_chains(&runtime);
            Ok(())
        }
        Command::Tools => {
            let runtime = load_runtime()?;
            list_tools(&runtime);
            Ok(())
        }
        Command::Run(args) => {
            let runtime = load_runtime()?;
            pipeline_cmd::handle_run(args, &runtime, &cancel_on_ctrl_c()).await
        }
        Command::Agent(args) => {
            let runtime = load_runtime()?;
            agent_cmd::handle_agent(args, &runtime, &cancel_on_ctrl_c()).await
        }
        Command::Exec(args) => {
            let runtime = load_runtime()?;
            agent_cmd::handle_exec(args, &runtime, &cancel_on_ctrl_c()).await
        }
        Command::Chat(args) => {
            let runtime = load_runtime()?;
            chat::handle_chat(args, &runtime, &cancel_on_ctrl_c()).await
        }
    }
}

fn load_runtime() -> Result<Runtime> {
    Runtime::from_config(Config::load()?)
}

/// Token cancelled on the first Ctrl-C; in-flight tools and planner calls stop.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "⏹️  Cancelling...".yellow());
            trigger.cancel();
        }
    });
    cancel
}

fn list_chains(runtime: &Runtime) {
    println!("{}", "Registered chains:".bold());
    for name in runtime.chains().list() {
        println!("  • {name}");
    }
}

fn list_tools(runtime: &Runtime) {
    for capability in runtime.agent().capabilities().iter() {
        println!("{}", capability.name().bold().green());
        for line in capability.description().lines() {
            println!("    {line}");
        }
        println!();
    }
}
