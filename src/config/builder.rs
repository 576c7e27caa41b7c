use anyhow::Result;

use super::types::{Config, LlmSettings, PipelineSettings, PlannerSettings, ToolchainSettings};

#[derive(Debug)]
pub struct ConfigBuilder {
    pub(super) llm: LlmSettings,
    pub(super) planner: PlannerSettings,
    pub(super) pipeline: PipelineSettings,
    pub(super) toolchain: ToolchainSettings,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            llm: LlmSettings::default(),
            planner: PlannerSettings::default(),
            pipeline: PipelineSettings::default(),
            toolchain: ToolchainSettings::default(),
        }
    }

    pub fn with_llm<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut LlmSettings),
    {
        update(&mut self.llm);
        self
    }

    pub fn with_planner<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut PlannerSettings),
    {
        update(&mut self.planner);
        self
    }

    pub fn with_pipeline<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut PipelineSettings),
    {
        update(&mut self.pipeline);
        self
    }

    pub fn with_toolchain<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut ToolchainSettings),
    {
        update(&mut self.toolchain);
        self
    }

    pub fn build(self) -> Result<Config> {
        Ok(Config {
            llm: self.llm,
            planner: self.planner,
            pipeline: self.pipeline,
            toolchain: self.toolchain,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
