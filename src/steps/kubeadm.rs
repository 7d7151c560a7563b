//! kubeadm step: initialise a cluster on the bootstrap node or join an
//! existing one.

use crate::config::{KubeadmConfig, WorkflowConfig};
use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::steps::{docker, Step};
use crate::templates::{ScriptTemplate, TemplateStore};
use std::io::Write;
use std::sync::Arc;

/// Registry key, also the name of the step's template.
pub const STEP_NAME: &str = "kubeadm";

/// Runs the kubeadm script for one node.
#[derive(Debug, Clone)]
pub struct KubeadmStep {
    script: ScriptTemplate,
}

/// Construct the step from its template.
pub fn init(templates: &TemplateStore) -> Result<Arc<dyn Step>> {
    let script = templates.get_template(STEP_NAME)?;
    Ok(Arc::new(KubeadmStep::new(script)))
}

impl KubeadmStep {
    pub fn new(script: ScriptTemplate) -> Self {
        Self { script }
    }

    /// Populate the kubeadm tool config from workflow state.
    ///
    /// Only the bootstrap node gets an advertise address, and only workers
    /// look up a master. A non-bootstrap master is left alone: it neither
    /// looks up nor assigns a master address.
    fn derive(config: &mut WorkflowConfig) -> Result<()> {
        let kubeadm = &mut config.kubeadm_config;
        kubeadm.provider = config.provider.to_string();
        kubeadm.is_bootstrap = config.is_bootstrap;
        kubeadm.is_master = config.is_master;
        kubeadm.internal_dns_name = config.internal_dns_name.clone();
        kubeadm.external_dns_name = config.external_dns_name.clone();
        kubeadm.kubernetes_version = config.cluster.kubernetes_version.clone();
        kubeadm.pod_cidr = config.cluster.pod_cidr.clone();
        kubeadm.service_cidr = config.cluster.service_cidr.clone();
        kubeadm.token = config.cluster.bootstrap_token.clone();

        // kubeadm accepts only an IPv4 or IPv6 literal as advertise address.
        if config.is_bootstrap {
            config.kubeadm_config.advertise_address = config.node.private_ip.clone();
        } else if !config.is_master {
            match config.get_master() {
                Some(master) => config.kubeadm_config.master_private_ip = master.private_ip,
                None => {
                    return Err(ProvisionError::precondition(format!(
                        "no masters in the {} cluster",
                        config.cluster_id
                    )))
                }
            }
        }

        Ok(())
    }

    fn validate(kubeadm: &KubeadmConfig) -> Result<()> {
        if kubeadm.external_dns_name.is_empty() {
            return Err(ProvisionError::precondition(
                "external dns name should be set",
            ));
        }
        if kubeadm.internal_dns_name.is_empty() {
            return Err(ProvisionError::precondition(
                "internal dns name should be set",
            ));
        }
        if !kubeadm.is_bootstrap && kubeadm.master_private_ip.is_empty() {
            return Err(ProvisionError::precondition("master address should be set"));
        }
        Ok(())
    }
}

impl Step for KubeadmStep {
    fn run(&self, ctx: &Context, out: &mut dyn Write, config: &mut WorkflowConfig) -> Result<()> {
        Self::derive(config)?;
        Self::validate(&config.kubeadm_config)?;

        let kubeadm = &config.kubeadm_config;
        tracing::debug!(
            "kubeadm step: {} cluster: isBootstrap={} isMaster={} extDNS={} intDNS={} advertise={} masterIP={}",
            config.cluster_id,
            kubeadm.is_bootstrap,
            kubeadm.is_master,
            kubeadm.external_dns_name,
            kubeadm.internal_dns_name,
            kubeadm.advertise_address,
            kubeadm.master_private_ip
        );

        let script = self
            .script
            .render(kubeadm)
            .map_err(|e| ProvisionError::in_step(STEP_NAME, e))?;

        config
            .runner()
            .run(ctx, &config.node, &script, out)
            .map_err(|e| ProvisionError::in_step(STEP_NAME, e))
    }

    // kubeadm has no compensating action once it has touched cluster state;
    // a failed node is re-provisioned from scratch.
    fn rollback(&self, _: &Context, _: &mut dyn Write, _: &mut WorkflowConfig) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        STEP_NAME
    }

    fn description(&self) -> &'static str {
        "run kubeadm"
    }

    fn depends(&self) -> Vec<&'static str> {
        vec![docker::STEP_NAME]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MasterLookup, MasterRegistry, Node};
    use crate::error::ErrorKind;
    use crate::shell::MockRunner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_SCRIPT: &str =
        "bootstrap=${is_bootstrap} advertise=${advertise_address} master=${master_private_ip}";

    #[derive(Default)]
    struct CountingLookup {
        master: Option<Node>,
        calls: AtomicUsize,
    }

    impl MasterLookup for CountingLookup {
        fn get_master(&self, _cluster_id: &str) -> Option<Node> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.master.clone()
        }
    }

    fn step() -> KubeadmStep {
        KubeadmStep::new(ScriptTemplate::parse(STEP_NAME, TEST_SCRIPT))
    }

    fn node(id: &str, ip: &str) -> Node {
        Node {
            id: id.to_string(),
            private_ip: ip.to_string(),
            ..Default::default()
        }
    }

    fn config(runner: &Arc<MockRunner>) -> WorkflowConfig {
        let mut config = WorkflowConfig::new("c1", node("node-1", "10.0.0.5"), runner.clone());
        config.external_dns_name = "ext.example.com".to_string();
        config.internal_dns_name = "int.example.com".to_string();
        config
    }

    fn run(step: &KubeadmStep, config: &mut WorkflowConfig) -> Result<()> {
        step.run(&Context::new(), &mut Vec::new(), config)
    }

    #[test]
    fn bootstrap_sets_advertise_address_and_runs() {
        let runner = Arc::new(MockRunner::new());
        let mut config = config(&runner);
        config.is_bootstrap = true;
        config.is_master = true;

        run(&step(), &mut config).unwrap();

        assert_eq!(config.kubeadm_config.advertise_address, "10.0.0.5");
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].script,
            "bootstrap=true advertise=10.0.0.5 master="
        );
    }

    #[test]
    fn worker_uses_master_private_ip() {
        let runner = Arc::new(MockRunner::new());
        let masters = MasterRegistry::new();
        masters.add("c1", node("master-1", "10.0.0.4"));
        let mut config = config(&runner).with_master_lookup(Arc::new(masters));

        run(&step(), &mut config).unwrap();

        assert_eq!(config.kubeadm_config.master_private_ip, "10.0.0.4");
        assert!(config.kubeadm_config.advertise_address.is_empty());
        assert_eq!(runner.calls()[0].script, "bootstrap=false advertise= master=10.0.0.4");
    }

    #[test]
    fn worker_without_master_fails_before_validation() {
        let runner = Arc::new(MockRunner::new());
        let mut config = config(&runner);
        // DNS would fail validation too; the lookup failure must win.
        config.external_dns_name.clear();

        let err = run(&step(), &mut config).unwrap_err();

        assert_eq!(err.to_string(), "no masters in the c1 cluster");
        assert_eq!(err.kind(), ErrorKind::UnresolvedPrecondition);
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn empty_external_dns_fails_first() {
        let runner = Arc::new(MockRunner::new());
        let mut config = config(&runner);
        config.is_bootstrap = true;
        config.external_dns_name.clear();
        config.internal_dns_name.clear();

        let err = run(&step(), &mut config).unwrap_err();

        assert_eq!(err.to_string(), "external dns name should be set");
        assert!(err.is_precondition());
        assert_eq!(runner.call_count(), 0);
        // Derivation happened regardless of the validation outcome.
        assert_eq!(config.kubeadm_config.advertise_address, "10.0.0.5");
    }

    #[test]
    fn empty_internal_dns_fails_after_external_check() {
        let runner = Arc::new(MockRunner::new());
        let mut config = config(&runner);
        config.is_bootstrap = true;
        config.internal_dns_name.clear();

        let err = run(&step(), &mut config).unwrap_err();

        assert_eq!(err.to_string(), "internal dns name should be set");
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn empty_master_address_from_lookup_fails_last() {
        let runner = Arc::new(MockRunner::new());
        let masters = MasterRegistry::new();
        masters.add("c1", node("master-1", ""));
        let mut config = config(&runner).with_master_lookup(Arc::new(masters));

        let err = run(&step(), &mut config).unwrap_err();

        assert_eq!(err.to_string(), "master address should be set");
        assert_eq!(runner.call_count(), 0);
    }

    // Non-bootstrap masters skip the lookup and never assign a master
    // address; they only pass validation when one was seeded beforehand.
    #[test]
    fn non_bootstrap_master_skips_lookup_and_assignment() {
        let runner = Arc::new(MockRunner::new());
        let lookup = Arc::new(CountingLookup {
            master: Some(node("master-1", "10.0.0.4")),
            ..Default::default()
        });
        let mut config = config(&runner).with_master_lookup(lookup.clone());
        config.is_master = true;

        let err = run(&step(), &mut config).unwrap_err();

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert!(config.kubeadm_config.master_private_ip.is_empty());
        assert!(config.kubeadm_config.advertise_address.is_empty());
        assert_eq!(err.to_string(), "master address should be set");
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn non_bootstrap_master_runs_with_seeded_master_address() {
        let runner = Arc::new(MockRunner::new());
        let lookup = Arc::new(CountingLookup::default());
        let mut config = config(&runner).with_master_lookup(lookup.clone());
        config.is_master = true;
        config.kubeadm_config.master_private_ip = "10.0.0.9".to_string();

        run(&step(), &mut config).unwrap();

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert_eq!(config.kubeadm_config.master_private_ip, "10.0.0.9");
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn bootstrap_never_looks_up_master() {
        let runner = Arc::new(MockRunner::new());
        let lookup = Arc::new(CountingLookup::default());
        let mut config = config(&runner).with_master_lookup(lookup.clone());
        config.is_bootstrap = true;

        run(&step(), &mut config).unwrap();

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn derivation_copies_identity_fields() {
        let runner = Arc::new(MockRunner::new());
        let mut config = config(&runner);
        config.is_bootstrap = true;
        config.provider = crate::config::Provider::Gce;
        config.cluster.kubernetes_version = "1.14.1".to_string();
        config.cluster.bootstrap_token = "abcdef.0123456789abcdef".to_string();

        run(&step(), &mut config).unwrap();

        let kubeadm = &config.kubeadm_config;
        assert_eq!(kubeadm.provider, "gce");
        assert!(kubeadm.is_bootstrap);
        assert!(!kubeadm.is_master);
        assert_eq!(kubeadm.external_dns_name, "ext.example.com");
        assert_eq!(kubeadm.internal_dns_name, "int.example.com");
        assert_eq!(kubeadm.kubernetes_version, "1.14.1");
        assert_eq!(kubeadm.token, "abcdef.0123456789abcdef");
    }

    #[test]
    fn runner_failure_is_wrapped_with_step_name() {
        let runner = Arc::new(MockRunner::failing(1));
        let mut config = config(&runner);
        config.is_bootstrap = true;

        let err = run(&step(), &mut config).unwrap_err();

        assert!(matches!(err, ProvisionError::StepFailed { ref step, .. } if step == "kubeadm"));
        assert!(err.to_string().starts_with("kubeadm step: "));
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn render_failure_is_wrapped_and_nothing_runs() {
        let runner = Arc::new(MockRunner::new());
        let mut config = config(&runner);
        config.is_bootstrap = true;
        let step = KubeadmStep::new(ScriptTemplate::parse(STEP_NAME, "${no_such_field}"));

        let err = run(&step, &mut config).unwrap_err();

        assert!(err.to_string().starts_with("kubeadm step: "));
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn output_is_streamed_to_sink() {
        let runner = Arc::new(MockRunner::new().with_output(&["[init] Using Kubernetes"]));
        let mut config = config(&runner);
        config.is_bootstrap = true;
        let mut out = Vec::new();

        step().run(&Context::new(), &mut out, &mut config).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "[init] Using Kubernetes\n");
    }

    #[test]
    fn rollback_is_a_no_op() {
        let runner = Arc::new(MockRunner::new());
        let mut config = config(&runner);
        let before = config.kubeadm_config.clone();
        let mut out = Vec::new();

        step()
            .rollback(&Context::new(), &mut out, &mut config)
            .unwrap();

        assert_eq!(config.kubeadm_config, before);
        assert!(out.is_empty());
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn metadata_is_constant() {
        let a = step();
        let b = KubeadmStep::new(ScriptTemplate::parse(STEP_NAME, "other"));
        assert_eq!(a.name(), "kubeadm");
        assert_eq!(a.description(), "run kubeadm");
        assert_eq!(a.depends(), vec!["docker"]);
        assert_eq!(a.depends(), b.depends());
    }

    #[test]
    fn init_requires_template() {
        let err = init(&TemplateStore::new()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Startup);
        assert!(init(&TemplateStore::builtin().unwrap()).is_ok());
    }
}
