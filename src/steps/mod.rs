//! Provisioning steps.
//!
//! This module provides:
//!
//! - [`Step`] - the contract every provisioning step honors
//! - [`StepRegistry`] - name to step mapping handed to the scheduler
//! - [`bootstrap`] - builds the registry of built-in steps at startup
//! - [`kubeadm`] and [`docker`] - the built-in steps
//!
//! # Example
//!
//! ```
//! use kubeprov::steps::bootstrap;
//! use kubeprov::templates::TemplateStore;
//!
//! let templates = TemplateStore::builtin().unwrap();
//! let registry = bootstrap(&templates).unwrap();
//!
//! let plan = registry.plan(&["kubeadm".to_string()]).unwrap();
//! let names: Vec<_> = plan.iter().map(|s| s.name()).collect();
//! assert_eq!(names, vec!["docker", "kubeadm"]);
//! ```

pub mod docker;
pub mod kubeadm;
pub mod registry;

pub use docker::DockerStep;
pub use kubeadm::KubeadmStep;
pub use registry::StepRegistry;

use crate::config::WorkflowConfig;
use crate::context::Context;
use crate::error::Result;
use crate::templates::TemplateStore;
use std::io::Write;
use std::sync::Arc;

/// A single unit of work in a node workflow.
///
/// Implementations hold no per-run state, so one instance can serve any
/// number of node workflows.
pub trait Step: Send + Sync {
    /// Derive, validate, and execute the step against `config`.
    ///
    /// Script output is streamed to `out`. Blocks until the script finishes.
    fn run(&self, ctx: &Context, out: &mut dyn Write, config: &mut WorkflowConfig) -> Result<()>;

    /// Undo the step after a failed run.
    fn rollback(&self, ctx: &Context, out: &mut dyn Write, config: &mut WorkflowConfig)
        -> Result<()>;

    /// Registry key.
    fn name(&self) -> &'static str;

    /// One-line summary for listings.
    fn description(&self) -> &'static str;

    /// Steps that must complete on the same node before this one runs.
    fn depends(&self) -> Vec<&'static str>;
}

/// Constructor run once at startup for a built-in step.
pub type StepInit = fn(&TemplateStore) -> Result<Arc<dyn Step>>;

/// Built-in steps in registration order.
pub const BUILTIN_STEPS: &[StepInit] = &[docker::init, kubeadm::init];

/// Build the registry of built-in steps.
///
/// Stops at the first step that cannot be constructed, so the process
/// never starts with a step that is missing its template.
pub fn bootstrap(templates: &TemplateStore) -> Result<StepRegistry> {
    let mut registry = StepRegistry::new();

    for init in BUILTIN_STEPS {
        let step = init(templates)?;
        tracing::debug!("Registered step '{}'", step.name());
        registry.register(step)?;
    }

    // Dangling dependencies are a packaging defect; surface them now.
    registry.dependency_graph()?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ProvisionError};

    #[test]
    fn bootstrap_registers_builtin_steps() {
        let registry = bootstrap(&TemplateStore::builtin().unwrap()).unwrap();
        assert_eq!(registry.names(), vec!["docker", "kubeadm"]);
    }

    #[test]
    fn bootstrap_fails_when_template_missing() {
        let mut templates = TemplateStore::new();
        templates.insert("docker", "echo docker");

        let err = bootstrap(&templates).unwrap_err();
        assert!(matches!(err, ProvisionError::TemplateNotFound { ref name } if name == "kubeadm"));
        assert_eq!(err.kind(), ErrorKind::Startup);
    }

    #[test]
    fn bootstrap_fails_on_first_missing_template() {
        let err = bootstrap(&TemplateStore::new()).unwrap_err();
        assert_eq!(err.to_string(), "template docker not found");
    }
}
