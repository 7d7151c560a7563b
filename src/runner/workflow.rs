//! Workflow execution for one node.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::WorkflowConfig;
use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::steps::{Step, StepRegistry};

use super::result::{StepResult, StepStatus};

/// Progress events emitted during workflow execution.
#[derive(Debug)]
pub enum RunProgress<'a> {
    /// A step is about to start.
    StepStarting {
        name: &'a str,
        index: usize,
        total: usize,
    },
    /// A step finished.
    StepFinished {
        name: &'a str,
        result: &'a StepResult,
    },
}

/// Runs an ordered plan of steps against one node.
pub struct WorkflowRunner {
    plan: Vec<Arc<dyn Step>>,
}

/// Result of running a workflow.
#[derive(Debug)]
pub struct WorkflowResult {
    /// Node the workflow ran against.
    pub node: String,
    /// One entry per planned step, in plan order.
    pub steps: Vec<StepResult>,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub finished_at: DateTime<Utc>,
    /// Total duration.
    pub duration: Duration,
    /// The error that stopped the workflow, if any.
    pub error: Option<ProvisionError>,
}

impl WorkflowResult {
    /// Whether every step completed.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, surfacing the stopping error.
    pub fn into_result(self) -> Result<Vec<StepResult>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.steps),
        }
    }
}

impl WorkflowRunner {
    /// Create a runner for an already ordered plan.
    pub fn new(plan: Vec<Arc<dyn Step>>) -> Self {
        Self { plan }
    }

    /// Plan `targets` and their dependencies from `registry`.
    pub fn from_registry(registry: &StepRegistry, targets: &[String]) -> Result<Self> {
        Ok(Self::new(registry.plan(targets)?))
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.plan.iter().map(|s| s.name()).collect()
    }

    /// Run the plan.
    pub fn run(
        &self,
        ctx: &Context,
        config: &mut WorkflowConfig,
        out: &mut dyn Write,
    ) -> WorkflowResult {
        self.run_with_progress(ctx, config, out, |_| {})
    }

    /// Run the plan with a progress callback.
    ///
    /// Steps run strictly in plan order. The first failing step is rolled
    /// back and stops the workflow; the steps after it stay `Pending`.
    pub fn run_with_progress(
        &self,
        ctx: &Context,
        config: &mut WorkflowConfig,
        out: &mut dyn Write,
        mut on_progress: impl FnMut(RunProgress<'_>),
    ) -> WorkflowResult {
        let start = Instant::now();
        let started_at = Utc::now();
        let node = config.node.to_string();
        let total = self.plan.len();

        let mut results: Vec<StepResult> = self
            .plan
            .iter()
            .map(|s| StepResult::pending(s.name()))
            .collect();
        let mut failure = None;

        for (index, step) in self.plan.iter().enumerate() {
            let name = step.name();

            if let Err(e) = ctx.check() {
                warn!("Workflow on {} cancelled before step '{}'", node, name);
                failure = Some(e);
                break;
            }

            info!("Running step '{}' on {} ({}/{})", name, node, index + 1, total);
            results[index].status = StepStatus::Running;
            on_progress(RunProgress::StepStarting { name, index, total });

            let step_start = Instant::now();
            match step.run(ctx, out, config) {
                Ok(()) => {
                    results[index] = StepResult::success(name, step_start.elapsed());
                    on_progress(RunProgress::StepFinished {
                        name,
                        result: &results[index],
                    });
                }
                Err(e) => {
                    error!("Step '{}' failed on {}: {}", name, node, e);
                    let mut result = StepResult::failure(name, step_start.elapsed(), e.to_string());

                    match step.rollback(ctx, out, config) {
                        Ok(()) => result.rolled_back = true,
                        Err(rollback_err) => {
                            warn!("Rollback of step '{}' failed: {}", name, rollback_err)
                        }
                    }

                    results[index] = result;
                    on_progress(RunProgress::StepFinished {
                        name,
                        result: &results[index],
                    });
                    failure = Some(e);
                    break;
                }
            }
        }

        WorkflowResult {
            node,
            steps: results,
            started_at,
            finished_at: Utc::now(),
            duration: start.elapsed(),
            error: failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Node;
    use crate::shell::MockRunner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedStep {
        name: &'static str,
        fail: bool,
        runs: AtomicUsize,
        rollbacks: AtomicUsize,
    }

    impl ScriptedStep {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                runs: AtomicUsize::new(0),
                rollbacks: AtomicUsize::new(0),
            })
        }
    }

    impl Step for ScriptedStep {
        fn run(&self, _: &Context, out: &mut dyn Write, _: &mut WorkflowConfig) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            writeln!(out, "{} ran", self.name)?;
            if self.fail {
                Err(ProvisionError::precondition(format!("{} broke", self.name)))
            } else {
                Ok(())
            }
        }

        fn rollback(&self, _: &Context, _: &mut dyn Write, _: &mut WorkflowConfig) -> Result<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "scripted"
        }

        fn depends(&self) -> Vec<&'static str> {
            Vec::new()
        }
    }

    fn config() -> WorkflowConfig {
        let node = Node {
            id: "node-1".to_string(),
            ..Default::default()
        };
        WorkflowConfig::new("c1", node, Arc::new(MockRunner::new()))
    }

    #[test]
    fn runs_all_steps_in_order() {
        let a = ScriptedStep::new("a", false);
        let b = ScriptedStep::new("b", false);
        let runner = WorkflowRunner::new(vec![a.clone() as Arc<dyn Step>, b.clone()]);
        let mut out = Vec::new();

        let result = runner.run(&Context::new(), &mut config(), &mut out);

        assert!(result.success());
        assert_eq!(String::from_utf8(out).unwrap(), "a ran\nb ran\n");
        assert!(result
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Completed));
        assert!(result.finished_at >= result.started_at);
        assert_eq!(result.node, "node-1");
    }

    #[test]
    fn failure_rolls_back_and_stops() {
        let a = ScriptedStep::new("a", true);
        let b = ScriptedStep::new("b", false);
        let runner = WorkflowRunner::new(vec![a.clone() as Arc<dyn Step>, b.clone()]);

        let result = runner.run(&Context::new(), &mut config(), &mut Vec::new());

        assert!(!result.success());
        assert_eq!(a.rollbacks.load(Ordering::SeqCst), 1);
        assert_eq!(b.runs.load(Ordering::SeqCst), 0);
        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert!(result.steps[0].rolled_back);
        assert_eq!(result.steps[1].status, StepStatus::Pending);

        let err = result.into_result().unwrap_err();
        assert_eq!(err.to_string(), "a broke");
    }

    #[test]
    fn cancelled_context_runs_nothing() {
        let a = ScriptedStep::new("a", false);
        let runner = WorkflowRunner::new(vec![a.clone() as Arc<dyn Step>]);
        let ctx = Context::new();
        ctx.cancel();

        let result = runner.run(&ctx, &mut config(), &mut Vec::new());

        assert!(matches!(result.error, Some(ProvisionError::Cancelled)));
        assert_eq!(a.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn progress_events_are_reported() {
        let runner = WorkflowRunner::new(vec![
            ScriptedStep::new("a", false) as Arc<dyn Step>,
            ScriptedStep::new("b", false),
        ]);
        let mut events = Vec::new();

        runner.run_with_progress(
            &Context::new(),
            &mut config(),
            &mut Vec::new(),
            |event| match event {
                RunProgress::StepStarting { name, index, total } => {
                    events.push(format!("start {} {}/{}", name, index + 1, total))
                }
                RunProgress::StepFinished { name, result } => {
                    events.push(format!("finish {} {}", name, result.status))
                }
            },
        );

        assert_eq!(
            events,
            vec![
                "start a 1/2",
                "finish a completed",
                "start b 2/2",
                "finish b completed",
            ]
        );
    }

    #[test]
    fn step_names_follow_plan() {
        let runner = WorkflowRunner::new(vec![
            ScriptedStep::new("docker", false) as Arc<dyn Step>,
            ScriptedStep::new("kubeadm", false),
        ]);
        assert_eq!(runner.step_names(), vec!["docker", "kubeadm"]);
    }
}
