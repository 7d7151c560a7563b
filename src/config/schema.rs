//! Node manifest schema.
//!
//! A manifest describes one node workflow: the cluster the node belongs
//! to, its role, its network identity, and how scripts reach it.

use serde::{Deserialize, Serialize};

use crate::config::workflow::{ClusterSettings, DockerConfig, Node, Provider};

/// Root manifest structure (one YAML file per node workflow).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeManifest {
    /// Cluster this node belongs to.
    pub cluster_id: String,

    /// Cloud provider hosting the node.
    pub provider: Provider,

    /// Node is the first node of a new cluster.
    pub is_bootstrap: bool,

    /// Node runs the control plane.
    pub is_master: bool,

    /// The node being provisioned.
    pub node: Node,

    /// DNS name the control plane is reachable at inside the cluster network.
    pub internal_dns_name: String,

    /// DNS name the control plane is reachable at from outside.
    pub external_dns_name: String,

    /// Cluster-wide Kubernetes settings.
    pub cluster: ClusterSettings,

    /// Container runtime settings.
    pub docker: DockerConfig,

    /// Seed values for the kubeadm tool config.
    pub kubeadm: KubeadmSeed,

    /// Masters already provisioned in this cluster.
    pub masters: Vec<Node>,

    /// How rendered scripts are executed.
    pub runner: RunnerConfig,

    /// Steps to run; dependencies are added automatically.
    pub steps: Vec<String>,
}

/// Values that may be provided to the kubeadm step ahead of derivation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeadmSeed {
    /// Control-plane address for joins that skip the master lookup.
    pub master_private_ip: String,
}

/// Script transport selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunnerConfig {
    /// Run scripts on this machine.
    Local {
        #[serde(default)]
        sudo: bool,
    },
    /// Run scripts on the node over SSH.
    Ssh {
        #[serde(default = "default_ssh_user")]
        user: String,
        #[serde(default = "default_ssh_port")]
        port: u16,
        #[serde(default)]
        key_file: Option<String>,
        #[serde(default)]
        sudo: bool,
    },
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig::Local { sudo: false }
    }
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let yaml = r#"
cluster_id: c1
provider: aws
is_bootstrap: false
is_master: false
node:
  id: node-2
  private_ip: 10.0.0.6
internal_dns_name: int.example.com
external_dns_name: ext.example.com
cluster:
  kubernetes_version: 1.14.1
docker:
  version: 18.06.3
masters:
  - id: node-1
    private_ip: 10.0.0.5
runner:
  type: ssh
  user: ubuntu
  sudo: true
steps: [kubeadm]
"#;
        let manifest: NodeManifest = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(manifest.cluster_id, "c1");
        assert_eq!(manifest.provider, Provider::Aws);
        assert_eq!(manifest.node.private_ip, "10.0.0.6");
        assert_eq!(manifest.masters.len(), 1);
        assert_eq!(manifest.cluster.kubernetes_version, "1.14.1");
        assert_eq!(
            manifest.runner,
            RunnerConfig::Ssh {
                user: "ubuntu".to_string(),
                port: 22,
                key_file: None,
                sudo: true,
            }
        );
        assert_eq!(manifest.steps, vec!["kubeadm".to_string()]);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let manifest: NodeManifest = serde_yaml::from_str("cluster_id: c1").unwrap();

        assert_eq!(manifest.runner, RunnerConfig::Local { sudo: false });
        assert!(manifest.masters.is_empty());
        assert!(manifest.kubeadm.master_private_ip.is_empty());
        assert!(manifest.steps.is_empty());
    }

    #[test]
    fn local_runner_parses() {
        let yaml = "runner:\n  type: local\n  sudo: true\n";
        let manifest: NodeManifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.runner, RunnerConfig::Local { sudo: true });
    }

    #[test]
    fn unknown_runner_type_is_rejected() {
        let yaml = "runner:\n  type: telnet\n";
        let result: std::result::Result<NodeManifest, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
