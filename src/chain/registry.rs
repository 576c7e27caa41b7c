use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::agent::Agent;

use super::Chain;
use super::error::ChainError;
use super::pipeline::PublishPipeline;
use super::planner_chain::PlannerChain;

/// Name → chain lookup shared by the command surface. Registration replaces
/// any chain already stored under the same name.
#[derive(Default)]
pub struct ChainRegistry {
    chains: RwLock<HashMap<String, Arc<dyn Chain>>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the publish pipeline and the planner-driven chain for `agent`.
    pub fn with_defaults(agent: Arc<Agent>, target_lang: &str) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(PublishPipeline::new(agent.clone(), target_lang)));
        registry.register(Arc::new(PlannerChain::new(agent)));
        registry
    }

    pub fn register(&self, chain: Arc<dyn Chain>) {
        let name = chain.name().to_string();
        debug!(chain = %name, "Registering chain");
        self.chains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, chain);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Chain>, ChainError> {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ChainError::ExecutorNotFound(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
