//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// kubeprov - provision Kubernetes nodes with kubeadm.
#[derive(Debug, Parser)]
#[command(name = "kubeprov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging and show all output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only show step status, not script output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run provisioning steps against the node described by a manifest
    Run(RunArgs),

    /// List registered steps
    List(ListArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Node manifest (YAML)
    #[arg(short, long, env = "KUBEPROV_CONFIG")]
    pub config: PathBuf,

    /// Step to run; repeatable. Overrides the manifest's `steps`
    #[arg(short, long = "step", value_name = "NAME")]
    pub steps: Vec<String>,

    /// Directory of `<step>.sh.tpl` files overriding the built-in scripts
    #[arg(long, env = "KUBEPROV_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// Print rendered scripts instead of executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Abort the workflow after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Directory of `<step>.sh.tpl` files overriding the built-in scripts
    #[arg(long, env = "KUBEPROV_TEMPLATES")]
    pub templates: Option<PathBuf>,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
