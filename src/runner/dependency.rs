//! Dependency graph for step execution ordering.
//!
//! Ordering is deterministic: among steps whose dependencies are all
//! satisfied, the one with the lexicographically smallest name goes first.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ProvisionError, Result};

/// Represents the dependency relationships between steps.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Map of step name to its direct dependencies.
    dependencies: BTreeMap<String, BTreeSet<String>>,
    /// Map of step name to steps that depend on it.
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create a new dependency graph builder.
    pub fn builder() -> DependencyGraphBuilder {
        DependencyGraphBuilder::new()
    }

    /// Check if a step exists in the graph.
    pub fn contains(&self, step: &str) -> bool {
        self.dependencies.contains_key(step)
    }

    /// Get the number of steps in the graph.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Returns steps in topological order (dependencies before dependents).
    ///
    /// Returns an error if a cycle is detected.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .dependencies
            .iter()
            .map(|(step, deps)| (step.as_str(), deps.len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(step, _)| *step)
            .collect();

        let mut result = Vec::with_capacity(self.len());

        while let Some(step) = ready.pop_first() {
            result.push(step.to_string());

            if let Some(dependents) = self.dependents.get(step) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(dependent.as_str());
                        }
                    }
                }
            }
        }

        if result.len() != self.len() {
            let cycle = self.find_cycle().unwrap_or_else(|| {
                in_degree
                    .iter()
                    .filter(|(_, &d)| d > 0)
                    .map(|(s, _)| s.to_string())
                    .collect()
            });

            return Err(ProvisionError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }

        Ok(result)
    }

    /// Find a cycle in the graph, returning the path if one exists.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs<'a>(
            node: &'a str,
            graph: &'a DependencyGraph,
            state: &mut BTreeMap<&'a str, State>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            state.insert(node, State::Visiting);
            path.push(node);

            if let Some(deps) = graph.dependencies.get(node) {
                for dep in deps {
                    match state.get(dep.as_str()) {
                        Some(State::Visiting) => {
                            let start = path.iter().position(|s| *s == dep.as_str())?;
                            let mut cycle: Vec<String> =
                                path[start..].iter().map(|s| s.to_string()).collect();
                            cycle.push(dep.clone());
                            return Some(cycle);
                        }
                        Some(State::Unvisited) | None => {
                            if let Some(cycle) = dfs(dep, graph, state, path) {
                                return Some(cycle);
                            }
                        }
                        Some(State::Visited) => {}
                    }
                }
            }

            path.pop();
            state.insert(node, State::Visited);
            None
        }

        let mut state: BTreeMap<&str, State> = self
            .dependencies
            .keys()
            .map(|s| (s.as_str(), State::Unvisited))
            .collect();
        let mut path = Vec::new();

        for step in self.dependencies.keys() {
            if state.get(step.as_str()) == Some(&State::Unvisited) {
                if let Some(cycle) = dfs(step, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    /// Get all transitive dependencies of a step.
    ///
    /// Returns steps the given step depends on, directly or indirectly.
    pub fn transitive_dependencies(&self, step: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        let mut to_visit = vec![step.to_string()];

        while let Some(current) = to_visit.pop() {
            if let Some(deps) = self.dependencies.get(&current) {
                for dep in deps {
                    if result.insert(dep.clone()) {
                        to_visit.push(dep.clone());
                    }
                }
            }
        }

        result
    }
}

/// Builder for constructing a DependencyGraph.
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraphBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step with its dependencies.
    pub fn add_step<I, S>(mut self, name: impl Into<String>, depends_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .entry(name.into())
            .or_default()
            .extend(depends_on.into_iter().map(Into::into));
        self
    }

    /// Build the dependency graph.
    ///
    /// Returns an error if any dependency references a non-existent step.
    pub fn build(self) -> Result<DependencyGraph> {
        let mut dependents: BTreeMap<String, BTreeSet<String>> = self
            .dependencies
            .keys()
            .map(|step| (step.clone(), BTreeSet::new()))
            .collect();

        for (step, deps) in &self.dependencies {
            for dep in deps {
                let Some(entry) = dependents.get_mut(dep) else {
                    return Err(ProvisionError::ConfigValidationError {
                        message: format!("Step '{}' depends on unknown step '{}'", step, dep),
                    });
                };
                entry.insert(step.clone());
            }
        }

        Ok(DependencyGraph {
            dependencies: self.dependencies,
            dependents,
        })
    }
}
