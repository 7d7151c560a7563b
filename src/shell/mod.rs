//! Script execution.

pub mod command;
pub mod runner;

pub use command::{execute_streaming, CommandOptions, CommandResult, OutputLine};
pub use runner::{
    from_config as runner_from_config, DryRunRunner, LocalRunner, MockRunner, RecordedRun, Runner,
    SshRunner,
};
