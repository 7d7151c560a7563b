//! Node manifest loading and validation.

use crate::config::schema::{NodeManifest, RunnerConfig};
use crate::error::{ProvisionError, Result};
use std::fs;
use std::path::Path;

/// Load, parse, and validate a manifest file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
/// Returns `ConfigValidationError` if required fields are missing.
pub fn load_manifest(path: &Path) -> Result<NodeManifest> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProvisionError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProvisionError::Io(e)
        }
    })?;

    let manifest = parse_manifest(&content, path)?;
    validate_manifest(&manifest)?;

    tracing::debug!(
        "Loaded manifest for node {} in cluster {} from {}",
        manifest.node,
        manifest.cluster_id,
        path.display()
    );

    Ok(manifest)
}

/// Parse YAML content into a [`NodeManifest`].
///
/// `source_path` is only used for error reporting.
pub fn parse_manifest(content: &str, source_path: &Path) -> Result<NodeManifest> {
    serde_yaml::from_str(content).map_err(|e| ProvisionError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Check the fields every workflow needs.
///
/// DNS names and master addresses are not checked here; the steps that
/// consume them validate them at run time.
pub fn validate_manifest(manifest: &NodeManifest) -> Result<()> {
    if manifest.cluster_id.trim().is_empty() {
        return Err(ProvisionError::ConfigValidationError {
            message: "cluster_id must be set".to_string(),
        });
    }

    if manifest.node.id.trim().is_empty() {
        return Err(ProvisionError::ConfigValidationError {
            message: "node.id must be set".to_string(),
        });
    }

    if let RunnerConfig::Ssh { port: 0, .. } = manifest.runner {
        return Err(ProvisionError::ConfigValidationError {
            message: "runner.port must be greater than 0".to_string(),
        });
    }

    Ok(())
}
