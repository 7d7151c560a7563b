//! Process execution with streamed output.

use crate::context::Context;
use crate::error::{ProvisionError, Result};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running process is checked for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of executing a command.
///
/// Output is not kept here; it is only delivered line by line to the
/// caller's callback.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    fn from_status(status: ExitStatus, duration: Duration) -> Self {
        Self {
            exit_code: status.code(),
            duration,
            success: status.success(),
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Text written to the process's stdin, which is then closed.
    pub stdin: Option<String>,
}

/// Output line from command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    /// The line's text, without the trailing newline.
    pub fn text(&self) -> &str {
        match self {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => s,
        }
    }
}

/// Run `program` with `args`, passing each output line to `on_line` as it
/// arrives.
///
/// The call blocks until the process exits. If `ctx` is cancelled while
/// the process runs, the process is killed and `Cancelled` is returned.
/// A non-zero exit is reported through [`CommandResult::success`], not as
/// an error.
pub fn execute_streaming(
    program: &str,
    args: &[String],
    options: &CommandOptions,
    ctx: &Context,
    on_line: &mut dyn FnMut(OutputLine),
) -> Result<CommandResult> {
    ctx.check()?;
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    cmd.stdin(if options.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let spawn_error = |message: String| ProvisionError::SpawnFailed {
        destination: program.to_string(),
        message,
    };

    let mut child = cmd.spawn().map_err(|e| spawn_error(e.to_string()))?;

    let stdin_handle = match (child.stdin.take(), options.stdin.clone()) {
        (Some(mut stdin), Some(input)) => Some(thread::spawn(move || {
            // A process that exits without reading its input closes the
            // pipe early; its exit status reports the failure.
            let _ = stdin.write_all(input.as_bytes());
        })),
        _ => None,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| spawn_error("stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| spawn_error("stderr was not captured".to_string()))?;

    let (tx, rx) = mpsc::channel();
    let tx_stdout = tx.clone();
    let tx_stderr = tx;

    let stdout_handle = thread::spawn(move || {
        for line in BufReader::new(stdout)
            .lines()
            .map_while(std::result::Result::ok)
        {
            let _ = tx_stdout.send(OutputLine::Stdout(line));
        }
    });

    let stderr_handle = thread::spawn(move || {
        for line in BufReader::new(stderr)
            .lines()
            .map_while(std::result::Result::ok)
        {
            let _ = tx_stderr.send(OutputLine::Stderr(line));
        }
    });

    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => on_line(line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if ctx.is_cancelled() {
            kill(&mut child, program);
            return Err(ProvisionError::Cancelled);
        }
    }

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if ctx.is_cancelled() {
            kill(&mut child, program);
            return Err(ProvisionError::Cancelled);
        }
        thread::sleep(POLL_INTERVAL);
    };

    if let Some(handle) = stdin_handle {
        let _ = handle.join();
    }
    let _ = stdout_handle.join();
    let _ = stderr_handle.join();

    Ok(CommandResult::from_status(status, start.elapsed()))
}

fn kill(child: &mut Child, program: &str) {
    tracing::warn!("Cancelling {} (pid {})", program, child.id());
    if let Err(e) = child.kill() {
        tracing::debug!("Failed to kill {}: {}", program, e);
    }
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> (String, Vec<String>, CommandOptions) {
        (
            "sh".to_string(),
            vec!["-s".to_string()],
            CommandOptions {
                stdin: Some(script.to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn streams_stdout_lines_in_order() {
        let (program, args, options) = sh("echo line1\necho line2\n");
        let mut lines = Vec::new();

        let result = execute_streaming(&program, &args, &options, &Context::new(), &mut |l| {
            lines.push(l)
        })
        .unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(
            lines,
            vec![
                OutputLine::Stdout("line1".to_string()),
                OutputLine::Stdout("line2".to_string()),
            ]
        );
    }

    #[test]
    fn streams_stderr() {
        let (program, args, options) = sh("echo oops >&2\n");
        let mut lines = Vec::new();

        execute_streaming(&program, &args, &options, &Context::new(), &mut |l| {
            lines.push(l)
        })
        .unwrap();

        assert_eq!(lines, vec![OutputLine::Stderr("oops".to_string())]);
    }

    #[test]
    fn reports_non_zero_exit() {
        let (program, args, options) = sh("exit 3\n");
        let result =
            execute_streaming(&program, &args, &options, &Context::new(), &mut |_| {}).unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
    }

    #[test]
    fn passes_env_and_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let (program, args, mut options) = sh("echo $MY_VAR\npwd\n");
        options.env.insert("MY_VAR".to_string(), "my_value".to_string());
        options.cwd = Some(temp.path().to_path_buf());

        let mut lines = Vec::new();
        execute_streaming(&program, &args, &options, &Context::new(), &mut |l| {
            lines.push(l.text().to_string())
        })
        .unwrap();

        assert_eq!(lines[0], "my_value");
        let name = temp.path().file_name().unwrap().to_str().unwrap();
        assert!(lines[1].ends_with(name));
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        let err = execute_streaming(
            "/nonexistent/kubeprov-test-binary",
            &[],
            &CommandOptions::default(),
            &Context::new(),
            &mut |_| {},
        )
        .unwrap_err();

        assert!(matches!(err, ProvisionError::SpawnFailed { .. }));
    }

    #[test]
    fn cancelled_context_never_spawns() {
        let ctx = Context::new();
        ctx.cancel();
        let (program, args, options) = sh("echo never\n");

        let err = execute_streaming(&program, &args, &options, &ctx, &mut |_| {}).unwrap_err();
        assert!(matches!(err, ProvisionError::Cancelled));
    }

    #[test]
    fn deadline_kills_long_running_process() {
        let ctx = Context::new().with_timeout(Duration::from_millis(200));
        let (program, args, options) = sh("sleep 30\n");
        let start = Instant::now();

        let err = execute_streaming(&program, &args, &options, &ctx, &mut |_| {}).unwrap_err();

        assert!(matches!(err, ProvisionError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn large_output_is_streamed_not_retained() {
        let (program, args, options) =
            sh("i=0\nwhile [ $i -lt 2000 ]; do echo line$i; i=$((i+1)); done\n");
        let mut count = 0;
        let mut last = String::new();

        let result = execute_streaming(&program, &args, &options, &Context::new(), &mut |l| {
            count += 1;
            last = l.text().to_string();
        })
        .unwrap();

        assert!(result.success);
        assert_eq!(count, 2000);
        assert_eq!(last, "line1999");
    }

    #[test]
    fn output_line_text() {
        assert_eq!(OutputLine::Stderr("x".to_string()).text(), "x");
    }
}
