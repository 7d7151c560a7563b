//! Step registry.

use crate::error::{ProvisionError, Result};
use crate::runner::dependency::DependencyGraph;
use crate::steps::Step;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Mapping from step name to the step instance.
///
/// Built once during application bootstrap and passed to whatever
/// schedules workflows. Tests can build isolated registries freely.
#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: BTreeMap<&'static str, Arc<dyn Step>>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateStep` if a step with the same name exists.
    pub fn register(&mut self, step: Arc<dyn Step>) -> Result<()> {
        let name = step.name();
        if self.steps.contains_key(name) {
            return Err(ProvisionError::DuplicateStep {
                name: name.to_string(),
            });
        }
        self.steps.insert(name, step);
        Ok(())
    }

    /// Get a step by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(name).cloned()
    }

    /// All step names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.keys().copied().collect()
    }

    /// Iterate over steps in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Step>> {
        self.steps.values()
    }

    /// Number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Dependency graph over every registered step.
    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        self.steps
            .values()
            .fold(DependencyGraph::builder(), |builder, step| {
                builder.add_step(step.name(), step.depends())
            })
            .build()
    }

    /// Resolve `targets` plus everything they depend on, in execution order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStep` for a target that is not registered and
    /// `CircularDependency` if the steps cannot be ordered.
    pub fn plan(&self, targets: &[String]) -> Result<Vec<Arc<dyn Step>>> {
        let graph = self.dependency_graph()?;

        let mut wanted = BTreeSet::new();
        for target in targets {
            if !graph.contains(target) {
                return Err(ProvisionError::UnknownStep {
                    name: target.clone(),
                });
            }
            wanted.extend(graph.transitive_dependencies(target));
            wanted.insert(target.clone());
        }

        Ok(graph
            .topological_order()?
            .into_iter()
            .filter(|name| wanted.contains(name))
            .filter_map(|name| self.get(&name))
            .collect())
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.names())
            .finish()
    }
}
