//! Visual theme and styling.

use console::Style;

use crate::runner::{format_duration, StepResult, StepStatus};

/// Terminal styles for status output.
#[derive(Debug, Clone)]
pub struct KubeprovTheme {
    /// Style for success messages (green).
    pub success: Style,
    /// Style for warning messages (orange).
    pub warning: Style,
    /// Style for error messages (red bold).
    pub error: Style,
    /// Style for running elements (cyan).
    pub info: Style,
    /// Style for dim/secondary text.
    pub dim: Style,
    /// Style for step titles and headers (bold).
    pub highlight: Style,
    /// Style for step counters (dim).
    pub step_number: Style,
}

impl Default for KubeprovTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl KubeprovTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            step_number: Style::new().dim(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            step_number: Style::new(),
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    /// Format the banner line printed before a step runs.
    pub fn format_step_start(&self, name: &str, index: usize, total: usize) -> String {
        format!(
            "{} {}",
            self.step_number.apply_to(format!("[{}/{}]", index + 1, total)),
            self.info.apply_to(format!("◉ {}", name))
        )
    }

    /// Format a finished step for the run summary.
    pub fn format_step_result(&self, result: &StepResult) -> String {
        match result.status {
            StepStatus::Completed => format!(
                "{} {}",
                self.success.apply_to(format!("✓ {}", result.name)),
                self.dim
                    .apply_to(format!("({})", format_duration(result.duration)))
            ),
            StepStatus::Failed => self.format_error(&format!(
                "{} - {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            )),
            StepStatus::Pending | StepStatus::Running => {
                format!("{}", self.dim.apply_to(result.summary_line()))
            }
        }
    }

    /// Format a header banner.
    pub fn format_header(&self, title: &str) -> String {
        format!("{} {}", self.info.apply_to("⎈"), self.highlight.apply_to(title))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stderr().is_term()
}
