//! List command implementation.
//!
//! The `kubeprov list` command lists registered steps.

use crate::cli::args::ListArgs;
use crate::error::Result;
use crate::steps::{bootstrap, StepRegistry};
use crate::ui::{KubeprovTheme, Output};

use super::dispatcher::{Command, CommandResult};
use super::load_templates;

/// The list command implementation.
pub struct ListCommand {
    args: ListArgs,
}

impl ListCommand {
    pub fn new(args: ListArgs) -> Self {
        Self { args }
    }

    /// One line per step: name, description, and dependencies.
    pub fn render(registry: &StepRegistry, theme: &KubeprovTheme) -> Vec<String> {
        let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);

        registry
            .iter()
            .map(|step| {
                let name = format!("{:width$}", step.name(), width = width);
                let deps = step.depends();
                let mut line = format!(
                    "  {}  {}",
                    theme.highlight.apply_to(name),
                    step.description()
                );
                if !deps.is_empty() {
                    line.push_str(&format!(
                        " {}",
                        theme.dim.apply_to(format!("(after: {})", deps.join(", ")))
                    ));
                }
                line
            })
            .collect()
    }
}

impl Command for ListCommand {
    fn execute(&self, output: &Output) -> Result<CommandResult> {
        let templates = load_templates(self.args.templates.as_deref())?;
        let registry = bootstrap(&templates)?;

        println!("Steps:");
        for line in Self::render(&registry, output.theme()) {
            println!("{}", line);
        }

        Ok(CommandResult::success())
    }
}
