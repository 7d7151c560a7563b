//! Step execution orchestration.

pub mod dependency;
pub mod result;
pub mod workflow;

pub use dependency::{DependencyGraph, DependencyGraphBuilder};
pub use result::{format_duration, StepResult, StepStatus};
pub use workflow::{RunProgress, WorkflowResult, WorkflowRunner};
