use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::agent::Agent;
use crate::capability::builtin::{Toolbox, Workspace, builtin_registry};
use crate::chain::{ChainRegistry, PublishPipeline};
use crate::client::HttpPlannerClient;
use crate::config::Config;
use crate::planner::PlannerClient;

const AGENT_NAME: &str = "reel";

/// Everything a command needs, wired from one configuration.
pub struct Runtime {
    config: Config,
    client: Arc<HttpPlannerClient>,
    agent: Arc<Agent>,
    chains: ChainRegistry,
}

impl Runtime {
    pub fn from_config(config: Config) -> Result<Self> {
        let client = Arc::new(
            HttpPlannerClient::new(&config.llm, &config.planner)
                .context("Failed to create planner client")?,
        );
        let planner: Arc<dyn PlannerClient> = client.clone();

        let toolbox = Toolbox {
            workspace: Workspace::new(&config.pipeline.workspace_dir),
            toolchain: config.toolchain.clone(),
            planner: planner.clone(),
            target_lang: config.pipeline.target_lang.clone(),
        };
        let capabilities =
            builtin_registry(&toolbox).context("Failed to register built-in capabilities")?;

        let agent = Arc::new(Agent::new(
            AGENT_NAME,
            capabilities,
            planner,
            config.planner.max_iterations,
        ));
        let chains = ChainRegistry::with_defaults(agent.clone(), &config.pipeline.target_lang);

        debug!(
            capabilities = agent.capabilities().len(),
            chains = chains.list().len(),
            workspace = %config.pipeline.workspace_dir.display(),
            "Runtime ready"
        );

        Ok(Self {
            config,
            client,
            agent,
            chains,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &HttpPlannerClient {
        &self.client
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn pipeline(&self) -> PublishPipeline {
        PublishPipeline::new(self.agent.clone(), self.config.pipeline.target_lang.clone())
    }
}
