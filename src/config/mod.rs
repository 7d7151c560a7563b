//! Configuration loading and workflow state.
//!
//! This module handles all aspects of configuration:
//! - Manifest schema definitions in [`schema`]
//! - Manifest loading and validation in [`loader`]
//! - Workflow-wide state and tool configs in [`workflow`]
//! - Template placeholder parsing in [`interpolation`]
//!
//! # Example
//!
//! ```
//! use kubeprov::config::{load_manifest, WorkflowConfig};
//! use kubeprov::shell::DryRunRunner;
//! use std::fs;
//! use std::sync::Arc;
//! use tempfile::TempDir;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("node.yml");
//! fs::write(&path, "cluster_id: c1\nnode:\n  id: node-1\n").unwrap();
//!
//! let manifest = load_manifest(&path).unwrap();
//! let config = WorkflowConfig::from_manifest(manifest, Arc::new(DryRunRunner));
//! assert_eq!(config.cluster_id, "c1");
//! assert!(config.get_master().is_none());
//! ```

pub mod interpolation;
pub mod loader;
pub mod schema;
pub mod workflow;

pub use interpolation::{parse_interpolation, Segment};
pub use loader::{load_manifest, parse_manifest, validate_manifest};
pub use schema::{KubeadmSeed, NodeManifest, RunnerConfig};
pub use workflow::{
    ClusterSettings, DockerConfig, KubeadmConfig, MasterLookup, MasterRegistry, Node, Provider,
    WorkflowConfig,
};
