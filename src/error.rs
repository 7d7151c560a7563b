//! Error types for provisioning operations.
//!
//! This module defines [`ProvisionError`], the error type used throughout
//! the crate, the [`ErrorKind`] tag callers branch on, and a [`Result`]
//! type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Unresolved preconditions are returned before any script is executed
//! - Runner failures are wrapped in [`ProvisionError::StepFailed`] so the
//!   failing step is named while the cause stays reachable via `source()`
//! - Startup failures (missing templates, duplicate steps) abort bootstrap
//! - Use `anyhow::Error` (via `ProvisionError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`ProvisionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Workflow state is missing something the step needs. Fix upstream.
    UnresolvedPrecondition,

    /// The rendered script could not be run, or ran and failed.
    Execution,

    /// The process cannot start with a usable step registry.
    Startup,

    /// The node manifest or requested plan is invalid.
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::UnresolvedPrecondition => "unresolved precondition",
            ErrorKind::Execution => "execution failure",
            ErrorKind::Startup => "startup failure",
            ErrorKind::Configuration => "configuration error",
        };
        write!(f, "{}", s)
    }
}

/// Core error type for provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A value the step depends on has not been resolved.
    #[error("{message}")]
    UnresolvedPrecondition { message: String },

    /// A step failed while rendering or executing its script.
    #[error("{step} step: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<ProvisionError>,
    },

    /// Script exited with a non-zero status.
    #[error("Command failed on {destination} with exit code {code:?}")]
    CommandFailed {
        destination: String,
        code: Option<i32>,
    },

    /// Script process could not be started.
    #[error("Failed to start command on {destination}: {message}")]
    SpawnFailed {
        destination: String,
        message: String,
    },

    /// The run context was cancelled or its deadline passed.
    #[error("Operation cancelled")]
    Cancelled,

    /// Named template is not known to the template store.
    #[error("template {name} not found")]
    TemplateNotFound { name: String },

    /// Template could not be rendered against the supplied data.
    #[error("Failed to render template '{name}': {message}")]
    TemplateRender { name: String, message: String },

    /// Two steps were registered under the same name.
    #[error("Step '{name}' is already registered")]
    DuplicateStep { name: String },

    /// Requested step is not registered.
    #[error("Unknown step: {name}")]
    UnknownStep { name: String },

    /// Step dependency cycle detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// Manifest file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse manifest file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid manifest structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProvisionError {
    /// Create an unresolved precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::UnresolvedPrecondition {
            message: message.into(),
        }
    }

    /// Wrap an error with the name of the step it came from.
    pub fn in_step(step: impl Into<String>, source: ProvisionError) -> Self {
        Self::StepFailed {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::UnresolvedPrecondition { .. } => ErrorKind::UnresolvedPrecondition,
            ProvisionError::StepFailed { .. }
            | ProvisionError::CommandFailed { .. }
            | ProvisionError::SpawnFailed { .. }
            | ProvisionError::Cancelled
            | ProvisionError::TemplateRender { .. }
            | ProvisionError::Io(_)
            | ProvisionError::Other(_) => ErrorKind::Execution,
            ProvisionError::TemplateNotFound { .. } | ProvisionError::DuplicateStep { .. } => {
                ErrorKind::Startup
            }
            ProvisionError::UnknownStep { .. }
            | ProvisionError::CircularDependency { .. }
            | ProvisionError::ConfigNotFound { .. }
            | ProvisionError::ConfigParseError { .. }
            | ProvisionError::ConfigValidationError { .. } => ErrorKind::Configuration,
        }
    }

    /// Check if this error is an unresolved precondition.
    pub fn is_precondition(&self) -> bool {
        self.kind() == ErrorKind::UnresolvedPrecondition
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
