//! Workflow-wide state shared by the steps of one node workflow.
//!
//! [`WorkflowConfig`] is created once per node workflow and handed to each
//! step in turn. Steps read the workflow-level fields and populate their own
//! tool-specific sub-records ([`KubeadmConfig`], [`DockerConfig`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::schema::NodeManifest;
use crate::shell::Runner;

/// Cloud provider hosting a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gce,
    #[serde(rename = "digitalocean")]
    DigitalOcean,
    #[serde(rename = "openstack")]
    OpenStack,
    Azure,
    #[default]
    #[serde(rename = "baremetal")]
    BareMetal,
}

impl Provider {
    /// Identifier used in manifests and rendered scripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gce => "gce",
            Provider::DigitalOcean => "digitalocean",
            Provider::OpenStack => "openstack",
            Provider::Azure => "azure",
            Provider::BareMetal => "baremetal",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A machine in the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    /// Stable identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Address on the cluster's private network (IPv4 or IPv6 literal).
    pub private_ip: String,

    /// Publicly reachable address, if any.
    pub public_ip: String,
}

impl Node {
    /// Address used to reach the node from the provisioning host.
    ///
    /// Prefers the public address and falls back to the private one.
    pub fn address(&self) -> &str {
        if self.public_ip.is_empty() {
            &self.private_ip
        } else {
            &self.public_ip
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// Cluster-wide Kubernetes settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub kubernetes_version: String,
    pub pod_cidr: String,
    pub service_cidr: String,
    /// kubeadm bootstrap token. Never logged.
    pub bootstrap_token: String,
}

/// Tool config consumed by the kubeadm template.
///
/// Populated by the kubeadm step on every run.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct KubeadmConfig {
    pub provider: String,
    pub is_bootstrap: bool,
    pub is_master: bool,
    pub internal_dns_name: String,
    pub external_dns_name: String,
    /// Set only for the bootstrap node.
    pub advertise_address: String,
    /// Set only for nodes joining as workers.
    pub master_private_ip: String,
    pub kubernetes_version: String,
    pub pod_cidr: String,
    pub service_cidr: String,
    pub token: String,
}

impl fmt::Debug for KubeadmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeadmConfig")
            .field("provider", &self.provider)
            .field("is_bootstrap", &self.is_bootstrap)
            .field("is_master", &self.is_master)
            .field("internal_dns_name", &self.internal_dns_name)
            .field("external_dns_name", &self.external_dns_name)
            .field("advertise_address", &self.advertise_address)
            .field("master_private_ip", &self.master_private_ip)
            .field("kubernetes_version", &self.kubernetes_version)
            .field("pod_cidr", &self.pod_cidr)
            .field("service_cidr", &self.service_cidr)
            .field("token", &"***")
            .finish()
    }
}

/// Container runtime settings, consumed by the docker template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    pub version: String,
    pub arch: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            arch: "amd64".to_string(),
        }
    }
}

/// Finds a master that is already provisioned in a cluster.
pub trait MasterLookup: Send + Sync {
    /// Return a master of `cluster_id`, or `None` if none is known.
    fn get_master(&self, cluster_id: &str) -> Option<Node>;
}

/// In-memory registry of provisioned masters, keyed by cluster and node id.
///
/// Clones share the same underlying map, so one registry can be handed to
/// every node workflow of a cluster.
#[derive(Debug, Clone, Default)]
pub struct MasterRegistry {
    inner: Arc<RwLock<BTreeMap<String, BTreeMap<String, Node>>>>,
}

impl MasterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `node` as a master of `cluster_id`.
    pub fn add(&self, cluster_id: &str, node: Node) {
        let mut clusters = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        clusters
            .entry(cluster_id.to_string())
            .or_default()
            .insert(node.id.clone(), node);
    }
}

impl MasterLookup for MasterRegistry {
    fn get_master(&self, cluster_id: &str) -> Option<Node> {
        let clusters = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        clusters.get(cluster_id)?.values().next().cloned()
    }
}

/// Mutable state for one node workflow.
///
/// The caller owns exclusive access for the duration of the workflow;
/// steps mutate their tool config in place.
pub struct WorkflowConfig {
    pub cluster_id: String,
    pub provider: Provider,
    pub is_bootstrap: bool,
    pub is_master: bool,
    pub node: Node,
    pub internal_dns_name: String,
    pub external_dns_name: String,
    pub cluster: ClusterSettings,
    pub kubeadm_config: KubeadmConfig,
    pub docker_config: DockerConfig,
    runner: Arc<dyn Runner>,
    masters: Arc<dyn MasterLookup>,
}

impl WorkflowConfig {
    /// Create a config for `node` in `cluster_id` with no known masters.
    pub fn new(cluster_id: impl Into<String>, node: Node, runner: Arc<dyn Runner>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            provider: Provider::default(),
            is_bootstrap: false,
            is_master: false,
            node,
            internal_dns_name: String::new(),
            external_dns_name: String::new(),
            cluster: ClusterSettings::default(),
            kubeadm_config: KubeadmConfig::default(),
            docker_config: DockerConfig::default(),
            runner,
            masters: Arc::new(MasterRegistry::new()),
        }
    }

    /// Build a config from a parsed manifest.
    ///
    /// The manifest's `masters` list seeds a fresh [`MasterRegistry`].
    pub fn from_manifest(manifest: NodeManifest, runner: Arc<dyn Runner>) -> Self {
        let masters = MasterRegistry::new();
        for master in manifest.masters {
            masters.add(&manifest.cluster_id, master);
        }

        let kubeadm_config = KubeadmConfig {
            master_private_ip: manifest.kubeadm.master_private_ip,
            ..Default::default()
        };

        Self {
            cluster_id: manifest.cluster_id,
            provider: manifest.provider,
            is_bootstrap: manifest.is_bootstrap,
            is_master: manifest.is_master,
            node: manifest.node,
            internal_dns_name: manifest.internal_dns_name,
            external_dns_name: manifest.external_dns_name,
            cluster: manifest.cluster,
            kubeadm_config,
            docker_config: manifest.docker,
            runner,
            masters: Arc::new(masters),
        }
    }

    /// Replace the master lookup collaborator.
    pub fn with_master_lookup(mut self, masters: Arc<dyn MasterLookup>) -> Self {
        self.masters = masters;
        self
    }

    /// Look up a master already provisioned in this node's cluster.
    pub fn get_master(&self) -> Option<Node> {
        self.masters.get_master(&self.cluster_id)
    }

    /// Runner that executes scripts against this workflow's node.
    pub fn runner(&self) -> Arc<dyn Runner> {
        Arc::clone(&self.runner)
    }
}

impl fmt::Debug for WorkflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowConfig")
            .field("cluster_id", &self.cluster_id)
            .field("provider", &self.provider)
            .field("is_bootstrap", &self.is_bootstrap)
            .field("is_master", &self.is_master)
            .field("node", &self.node)
            .field("internal_dns_name", &self.internal_dns_name)
            .field("external_dns_name", &self.external_dns_name)
            .field("kubeadm_config", &self.kubeadm_config)
            .field("docker_config", &self.docker_config)
            .field("runner", &self.runner.describe())
            .finish_non_exhaustive()
    }
}
