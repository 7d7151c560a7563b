//! Script runners.
//!
//! A [`Runner`] executes a rendered script against a node and streams the
//! script's output to a writer. Steps only see the trait, so transports can
//! be swapped without touching step logic:
//!
//! - [`LocalRunner`] runs the script on this machine
//! - [`SshRunner`] runs the script on the node over `ssh`
//! - [`DryRunRunner`] prints the script instead of running it
//! - [`MockRunner`] records scripts for tests

use crate::config::schema::RunnerConfig;
use crate::config::workflow::Node;
use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::shell::command::{execute_streaming, CommandOptions, OutputLine};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Executes rendered scripts against a node.
pub trait Runner: Send + Sync {
    /// Run `script` on `node`, writing its output to `out`.
    ///
    /// Blocks until the script finishes.
    fn run(&self, ctx: &Context, node: &Node, script: &str, out: &mut dyn Write) -> Result<()>;

    /// Short human-readable description of the transport.
    fn describe(&self) -> String;
}

/// Pipe `script` into `program args...` and copy every output line to `out`.
fn pipe_script(
    ctx: &Context,
    destination: &str,
    program: &str,
    args: &[String],
    script: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let options = CommandOptions {
        stdin: Some(script.to_string()),
        ..Default::default()
    };

    let mut write_error = None;
    let result = execute_streaming(program, args, &options, ctx, &mut |line: OutputLine| {
        if write_error.is_none() {
            if let Err(e) = writeln!(out, "{}", line.text()) {
                write_error = Some(e);
            }
        }
    })
    .map_err(|e| match e {
        ProvisionError::SpawnFailed { message, .. } => ProvisionError::SpawnFailed {
            destination: destination.to_string(),
            message,
        },
        other => other,
    })?;

    if let Some(e) = write_error {
        return Err(ProvisionError::Io(e));
    }

    tracing::debug!(
        "Script on {} exited with {:?} after {:?}",
        destination,
        result.exit_code,
        result.duration
    );

    if !result.success {
        return Err(ProvisionError::CommandFailed {
            destination: destination.to_string(),
            code: result.exit_code,
        });
    }

    Ok(())
}

/// Runs scripts on the local machine with `sh -s`.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner {
    /// Run the shell through `sudo -n`.
    pub sudo: bool,
}

impl LocalRunner {
    pub fn new(sudo: bool) -> Self {
        Self { sudo }
    }

    fn command(&self) -> (&'static str, Vec<String>) {
        if self.sudo {
            ("sudo", vec!["-n".into(), "sh".into(), "-s".into()])
        } else {
            ("sh", vec!["-s".into()])
        }
    }
}

impl Runner for LocalRunner {
    fn run(&self, ctx: &Context, node: &Node, script: &str, out: &mut dyn Write) -> Result<()> {
        let (program, args) = self.command();
        tracing::debug!("Running script for {} locally via {}", node, program);
        pipe_script(ctx, "local", program, &args, script, out)
    }

    fn describe(&self) -> String {
        if self.sudo {
            "local (sudo)".to_string()
        } else {
            "local".to_string()
        }
    }
}

/// Runs scripts on the node over `ssh`, feeding the script to a remote `sh -s`.
#[derive(Debug, Clone)]
pub struct SshRunner {
    pub user: String,
    pub port: u16,
    pub key_file: Option<PathBuf>,
    pub sudo: bool,
}

impl SshRunner {
    pub fn new(user: impl Into<String>, port: u16) -> Self {
        Self {
            user: user.into(),
            port,
            key_file: None,
            sudo: false,
        }
    }

    /// Arguments passed to `ssh` to reach `address`.
    pub fn ssh_args(&self, address: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-p".to_string(),
            self.port.to_string(),
        ];

        if let Some(key) = &self.key_file {
            args.push("-i".to_string());
            args.push(expand_home(key).display().to_string());
        }

        args.push(format!("{}@{}", self.user, address));
        if self.sudo {
            args.push("sudo".to_string());
            args.push("-n".to_string());
        }
        args.push("sh".to_string());
        args.push("-s".to_string());
        args
    }
}

impl Runner for SshRunner {
    fn run(&self, ctx: &Context, node: &Node, script: &str, out: &mut dyn Write) -> Result<()> {
        let address = node.address();
        if address.is_empty() {
            return Err(ProvisionError::SpawnFailed {
                destination: node.id.clone(),
                message: "node has no address".to_string(),
            });
        }

        tracing::debug!("Running script on {} via ssh {}@{}", node, self.user, address);
        pipe_script(ctx, address, "ssh", &self.ssh_args(address), script, out)
    }

    fn describe(&self) -> String {
        format!("ssh {}@<node>:{}", self.user, self.port)
    }
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Build the transport a manifest's `runner` section selects.
pub fn from_config(config: &RunnerConfig) -> Arc<dyn Runner> {
    match config {
        RunnerConfig::Local { sudo } => Arc::new(LocalRunner::new(*sudo)),
        RunnerConfig::Ssh {
            user,
            port,
            key_file,
            sudo,
        } => Arc::new(SshRunner {
            user: user.clone(),
            port: *port,
            key_file: key_file.as_ref().map(PathBuf::from),
            sudo: *sudo,
        }),
    }
}

/// Writes rendered scripts to the output instead of running them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl Runner for DryRunRunner {
    fn run(&self, _ctx: &Context, node: &Node, script: &str, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "# --- dry run on {} ---", node)?;
        out.write_all(script.as_bytes())?;
        if !script.ends_with('\n') {
            writeln!(out)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "dry run".to_string()
    }
}

/// A script handed to a [`MockRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub node_id: String,
    pub script: String,
}

/// Runner that records scripts instead of executing them.
///
/// Useful for testing steps without a shell.
#[derive(Debug, Default)]
pub struct MockRunner {
    calls: Mutex<Vec<RecordedRun>>,
    output: Vec<String>,
    exit_code: Option<i32>,
}

impl MockRunner {
    /// Create a runner that succeeds and prints nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner whose scripts exit with `code`.
    pub fn failing(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Default::default()
        }
    }

    /// Lines written to the output on every run.
    pub fn with_output(mut self, lines: &[&str]) -> Self {
        self.output = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Every recorded run, oldest first.
    pub fn calls(&self) -> Vec<RecordedRun> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded runs.
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Runner for MockRunner {
    fn run(&self, _ctx: &Context, node: &Node, script: &str, out: &mut dyn Write) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRun {
                node_id: node.id.clone(),
                script: script.to_string(),
            });

        for line in &self.output {
            writeln!(out, "{}", line)?;
        }

        match self.exit_code {
            Some(code) => Err(ProvisionError::CommandFailed {
                destination: node.id.clone(),
                code: Some(code),
            }),
            None => Ok(()),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node {
            id: "node-1".to_string(),
            private_ip: "10.0.0.5".to_string(),
            ..Default::default()
        }
    }

    #[test]
    #[cfg(unix)]
    fn local_runner_streams_output() {
        let mut out = Vec::new();
        LocalRunner::new(false)
            .run(&Context::new(), &node(), "echo hello\necho err >&2\n", &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hello\n"));
        assert!(text.contains("err\n"));
    }

    #[test]
    #[cfg(unix)]
    fn local_runner_reports_exit_code() {
        let mut out = Vec::new();
        let err = LocalRunner::new(false)
            .run(&Context::new(), &node(), "exit 4\n", &mut out)
            .unwrap_err();

        match err {
            ProvisionError::CommandFailed { destination, code } => {
                assert_eq!(destination, "local");
                assert_eq!(code, Some(4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn local_runner_command_with_sudo() {
        let (program, args) = LocalRunner::new(true).command();
        assert_eq!(program, "sudo");
        assert_eq!(args, vec!["-n", "sh", "-s"]);
        assert_eq!(LocalRunner::new(false).command().0, "sh");
    }

    #[test]
    fn ssh_args_include_port_user_and_remote_shell() {
        let runner = SshRunner::new("ubuntu", 2222);
        let args = runner.ssh_args("54.1.2.3");

        assert!(args.windows(2).any(|w| w == ["-p", "2222"]));
        assert!(args.contains(&"ubuntu@54.1.2.3".to_string()));
        assert_eq!(&args[args.len() - 2..], ["sh", "-s"]);
        assert!(!args.contains(&"sudo".to_string()));
    }

    #[test]
    fn ssh_args_with_key_and_sudo() {
        let mut runner = SshRunner::new("root", 22);
        runner.key_file = Some(PathBuf::from("/keys/id_rsa"));
        runner.sudo = true;
        let args = runner.ssh_args("10.0.0.5");

        assert!(args.windows(2).any(|w| w == ["-i", "/keys/id_rsa"]));
        assert_eq!(&args[args.len() - 4..], ["sudo", "-n", "sh", "-s"]);
    }

    #[test]
    fn ssh_runner_rejects_node_without_address() {
        let runner = SshRunner::new("root", 22);
        let node = Node {
            id: "ghost".to_string(),
            ..Default::default()
        };
        let err = runner
            .run(&Context::new(), &node, "true", &mut Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn expand_home_replaces_tilde() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_home(std::path::Path::new("~/.ssh/id_rsa")),
            PathBuf::from("/home/tester/.ssh/id_rsa")
        );
        assert_eq!(
            expand_home(std::path::Path::new("/abs/key")),
            PathBuf::from("/abs/key")
        );
    }

    #[test]
    fn from_config_selects_transport() {
        assert_eq!(from_config(&RunnerConfig::default()).describe(), "local");

        let ssh = RunnerConfig::Ssh {
            user: "ubuntu".to_string(),
            port: 2222,
            key_file: Some("~/.ssh/id_rsa".to_string()),
            sudo: true,
        };
        assert_eq!(from_config(&ssh).describe(), "ssh ubuntu@<node>:2222");
    }

    #[test]
    fn dry_run_prints_script() {
        let mut out = Vec::new();
        DryRunRunner
            .run(&Context::new(), &node(), "kubeadm init", &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("# --- dry run on node-1 ---\n"));
        assert!(text.ends_with("kubeadm init\n"));
    }

    #[test]
    fn mock_runner_records_and_fails() {
        let runner = MockRunner::failing(2).with_output(&["boom"]);
        let mut out = Vec::new();

        let err = runner
            .run(&Context::new(), &node(), "script", &mut out)
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::CommandFailed { code: Some(2), .. }
        ));
        assert_eq!(String::from_utf8(out).unwrap(), "boom\n");
        assert_eq!(
            runner.calls(),
            vec![RecordedRun {
                node_id: "node-1".to_string(),
                script: "script".to_string(),
            }]
        );
    }
}
