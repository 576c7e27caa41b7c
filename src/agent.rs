use std::fmt;
use std::sync::Arc;

use crate::capability::{Capability, CapabilityRegistry};
use crate::chain::ChainError;
use crate::config::DEFAULT_MAX_ITERATIONS;
use crate::planner::PlannerClient;

/// A named bundle of capabilities, the planner that chooses among them, and
/// the iteration cap for planner-driven runs.
///
/// Built once per task; the registry is not synchronised for concurrent mutation.
#[derive(Clone)]
pub struct Agent {
    name: String,
    capabilities: CapabilityRegistry,
    planner: Arc<dyn PlannerClient>,
    max_iterations: usize,
}

impl Agent {
    /// `max_iterations == 0` falls back to the default cap.
    pub fn new(
        name: impl Into<String>,
        capabilities: CapabilityRegistry,
        planner: Arc<dyn PlannerClient>,
        max_iterations: usize,
    ) -> Self {
        let max_iterations = if max_iterations == 0 {
            DEFAULT_MAX_ITERATIONS
        } else {
            max_iterations
        };

        Self {
            name: name.into(),
            capabilities,
            planner,
            max_iterations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.capabilities
    }

    pub fn planner(&self) -> &Arc<dyn PlannerClient> {
        &self.planner
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn capability(&self, name: &str) -> Result<Arc<dyn Capability>, ChainError> {
        self.capabilities
            .get(name)
            .ok_or_else(|| ChainError::ToolNotFound(name.to_string()))
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities.names())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}
