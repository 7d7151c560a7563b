//! kubeprov - Kubernetes node provisioning with kubeadm.
//!
//! A node workflow is an ordered plan of steps run against one machine.
//! Each step derives its tool config from workflow-wide state, checks its
//! preconditions, renders a shell script from an embedded template, and
//! hands the script to a [`shell::Runner`].
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Node manifests and workflow state
//! - [`context`] - Cancellation and deadlines
//! - [`error`] - Error types and result aliases
//! - [`runner`] - Plan ordering and workflow execution
//! - [`shell`] - Script transports
//! - [`steps`] - The step contract, registry, and built-in steps
//! - [`templates`] - Embedded script templates
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use kubeprov::config::{Node, WorkflowConfig};
//! use kubeprov::context::Context;
//! use kubeprov::shell::MockRunner;
//! use kubeprov::steps::bootstrap;
//! use kubeprov::templates::TemplateStore;
//!
//! let registry = bootstrap(&TemplateStore::builtin().unwrap()).unwrap();
//! let kubeadm = registry.get("kubeadm").unwrap();
//!
//! let runner = Arc::new(MockRunner::new());
//! let node = Node { id: "n1".into(), private_ip: "10.0.0.5".into(), ..Default::default() };
//! let mut config = WorkflowConfig::new("c1", node, runner.clone());
//! config.is_bootstrap = true;
//! config.is_master = true;
//! config.external_dns_name = "ext.example.com".into();
//! config.internal_dns_name = "int.example.com".into();
//!
//! kubeadm.run(&Context::new(), &mut std::io::sink(), &mut config).unwrap();
//! assert_eq!(config.kubeadm_config.advertise_address, "10.0.0.5");
//! assert!(runner.calls()[0].script.contains("ext.example.com"));
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod runner;
pub mod shell;
pub mod steps;
pub mod templates;
pub mod ui;

pub use error::{ErrorKind, ProvisionError, Result};
