//! Run command implementation.
//!
//! The `kubeprov run` command provisions the node a manifest describes.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::args::RunArgs;
use crate::config::{load_manifest, NodeManifest, WorkflowConfig};
use crate::context::Context;
use crate::error::Result;
use crate::runner::{format_duration, RunProgress, WorkflowRunner};
use crate::shell::{runner_from_config, DryRunRunner, Runner};
use crate::steps::{bootstrap, kubeadm};
use crate::ui::Output;

use super::dispatcher::{Command, CommandResult};
use super::load_templates;

/// The run command implementation.
pub struct RunCommand {
    args: RunArgs,
}

impl RunCommand {
    pub fn new(args: RunArgs) -> Self {
        Self { args }
    }

    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Steps to run: `--step` flags, then the manifest, then kubeadm alone.
    pub fn targets(&self, manifest: &NodeManifest) -> Vec<String> {
        if !self.args.steps.is_empty() {
            self.args.steps.clone()
        } else if !manifest.steps.is_empty() {
            manifest.steps.clone()
        } else {
            vec![kubeadm::STEP_NAME.to_string()]
        }
    }

    fn build_runner(&self, manifest: &NodeManifest) -> Arc<dyn Runner> {
        if self.args.dry_run {
            Arc::new(DryRunRunner)
        } else {
            runner_from_config(&manifest.runner)
        }
    }

    fn build_context(&self) -> Context {
        let ctx = Context::new();
        match self.args.timeout {
            Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
            None => ctx,
        }
    }
}

impl Command for RunCommand {
    fn execute(&self, output: &Output) -> Result<CommandResult> {
        let manifest = load_manifest(&self.args.config)?;
        let templates = load_templates(self.args.templates.as_deref())?;
        let registry = bootstrap(&templates)?;

        let targets = self.targets(&manifest);
        let workflow = WorkflowRunner::from_registry(&registry, &targets)?;
        let runner = self.build_runner(&manifest);

        tracing::debug!(
            "Planned steps {:?} for targets {:?}",
            workflow.step_names(),
            targets
        );

        let mut config = WorkflowConfig::from_manifest(manifest, runner.clone());
        output.status(&output.theme().format_header(&format!(
            "Provisioning {} in cluster {} ({})",
            config.node,
            config.cluster_id,
            runner.describe()
        )));

        let ctx = self.build_context();
        let mut sink = output.script_sink();
        let theme = output.theme();

        let result = workflow.run_with_progress(&ctx, &mut config, sink.as_mut(), |event| {
            if let RunProgress::StepStarting { name, index, total } = event {
                output.status(&theme.format_step_start(name, index, total));
            }
        });
        sink.flush()?;

        output.status("");
        for step in &result.steps {
            output.status(&theme.format_step_result(step));
        }

        match &result.error {
            None => {
                output.success(&format!(
                    "{} provisioned in {}",
                    result.node,
                    format_duration(result.duration)
                ));
                Ok(CommandResult::success())
            }
            Some(e) => {
                tracing::debug!("Workflow stopped: {:?}", e);
                output.error(&format!("{} ({})", e, e.kind()));
                Ok(CommandResult::failure(1))
            }
        }
    }
}
