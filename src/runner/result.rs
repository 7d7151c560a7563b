//! Per-step execution status and results.

use std::time::Duration;

/// Status of a step in a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Step is waiting to run.
    Pending,

    /// Step is currently executing.
    Running,

    /// Step completed successfully.
    Completed,

    /// Step failed.
    Failed,
}

impl StepStatus {
    /// Check if this is a terminal state (no more changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Pending => '○',
            StepStatus::Running => '◉',
            StepStatus::Completed => '✓',
            StepStatus::Failed => '✗',
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Result of one step in a workflow run.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Step name.
    pub name: String,

    /// Final status.
    pub status: StepStatus,

    /// Execution duration.
    pub duration: Duration,

    /// Error message (if failed).
    pub error: Option<String>,

    /// Whether rollback ran after a failure.
    pub rolled_back: bool,
}

impl StepResult {
    /// Create a result for a step that never started.
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Pending,
            duration: Duration::ZERO,
            error: None,
            rolled_back: false,
        }
    }

    /// Create a success result.
    pub fn success(name: &str, duration: Duration) -> Self {
        Self {
            status: StepStatus::Completed,
            duration,
            ..Self::pending(name)
        }
    }

    /// Create a failure result.
    pub fn failure(name: &str, duration: Duration, error: String) -> Self {
        Self {
            status: StepStatus::Failed,
            duration,
            error: Some(error),
            ..Self::pending(name)
        }
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let c = self.status.display_char();
        match self.status {
            StepStatus::Completed => {
                format!("{} {} ({})", c, self.name, format_duration(self.duration))
            }
            StepStatus::Failed => {
                let error = self.error.as_deref().unwrap_or("unknown error");
                format!("{} {} - {}", c, self.name, error)
            }
            StepStatus::Pending => format!("{} {} (not run)", c, self.name),
            StepStatus::Running => format!("{} {}", c, self.name),
        }
    }
}

/// Format a duration for display.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}
