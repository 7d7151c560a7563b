//! kubeprov CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use kubeprov::cli::{Cli, CommandDispatcher};
use kubeprov::ui::{Output, OutputMode};
use kubeprov::ErrorKind;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("kubeprov=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kubeprov=info"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("kubeprov starting with args: {:?}", cli);

    let output = Output::new(OutputMode::from_flags(cli.debug, cli.quiet), cli.no_color);
    let dispatcher = CommandDispatcher::new();

    match dispatcher.dispatch(&cli, &output) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            output.error(&format!("Error: {}", e));
            match e.kind() {
                ErrorKind::Startup | ErrorKind::Configuration => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}
