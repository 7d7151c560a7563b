//! docker step: install the container runtime kubeadm needs.

use crate::config::WorkflowConfig;
use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::steps::Step;
use crate::templates::{ScriptTemplate, TemplateStore};
use std::io::Write;
use std::sync::Arc;

pub const STEP_NAME: &str = "docker";

#[derive(Debug, Clone)]
pub struct DockerStep {
    script: ScriptTemplate,
}

pub fn init(templates: &TemplateStore) -> Result<Arc<dyn Step>> {
    let script = templates.get_template(STEP_NAME)?;
    Ok(Arc::new(DockerStep::new(script)))
}

impl DockerStep {
    pub fn new(script: ScriptTemplate) -> Self {
        Self { script }
    }
}

impl Step for DockerStep {
    fn run(&self, ctx: &Context, out: &mut dyn Write, config: &mut WorkflowConfig) -> Result<()> {
        if config.docker_config.version.is_empty() {
            return Err(ProvisionError::precondition("docker version should be set"));
        }

        tracing::debug!(
            "docker step: {} cluster: version={} arch={}",
            config.cluster_id,
            config.docker_config.version,
            config.docker_config.arch
        );

        let script = self
            .script
            .render(&config.docker_config)
            .map_err(|e| ProvisionError::in_step(STEP_NAME, e))?;

        config
            .runner()
            .run(ctx, &config.node, &script, out)
            .map_err(|e| ProvisionError::in_step(STEP_NAME, e))
    }

    fn rollback(&self, _: &Context, _: &mut dyn Write, _: &mut WorkflowConfig) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        STEP_NAME
    }

    fn description(&self) -> &'static str {
        "install docker"
    }

    fn depends(&self) -> Vec<&'static str> {
        Vec::new()
    }
}
