//! Output mode and writer.

use std::io::{self, Write};
use std::str::FromStr;

use console::Term;

use super::theme::{should_use_colors, KubeprovTheme};

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Show all output including script output and debug logs.
    Verbose,
    /// Show script output and step status.
    #[default]
    Normal,
    /// Show step status only.
    Quiet,
    /// Show nothing except errors.
    Silent,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verbose" => Ok(Self::Verbose),
            "normal" => Ok(Self::Normal),
            "quiet" => Ok(Self::Quiet),
            "silent" => Ok(Self::Silent),
            _ => Err(format!("unknown output mode: {}", s)),
        }
    }
}

impl OutputMode {
    /// Pick the mode from the global `--debug` and `--quiet` flags.
    pub fn from_flags(debug: bool, quiet: bool) -> Self {
        match (debug, quiet) {
            (true, _) => Self::Verbose,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }

    /// Check if this mode shows script output.
    pub fn shows_command_output(&self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }

    /// Check if this mode shows status messages.
    pub fn shows_status(&self) -> bool {
        !matches!(self, Self::Silent)
    }
}

/// Output writer that respects output mode.
///
/// Status lines go to stderr so that stdout carries only script output.
#[derive(Debug)]
pub struct Output {
    mode: OutputMode,
    theme: KubeprovTheme,
    term: Term,
}

impl Output {
    pub fn new(mode: OutputMode, no_color: bool) -> Self {
        let theme = if no_color || !should_use_colors() {
            KubeprovTheme::plain()
        } else {
            KubeprovTheme::new()
        };
        Self {
            mode,
            theme,
            term: Term::stderr(),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn theme(&self) -> &KubeprovTheme {
        &self.theme
    }

    /// Write a status line if the mode allows it.
    pub fn status(&self, msg: &str) {
        if self.mode.shows_status() {
            let _ = self.term.write_line(msg);
        }
    }

    pub fn success(&self, msg: &str) {
        self.status(&self.theme.format_success(msg));
    }

    pub fn warning(&self, msg: &str) {
        self.status(&self.theme.format_warning(msg));
    }

    /// Errors are always shown.
    pub fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.theme.format_error(msg));
    }

    /// Sink for script output: stdout, or nothing in quiet modes.
    pub fn script_sink(&self) -> Box<dyn Write> {
        if self.mode.shows_command_output() {
            Box::new(io::stdout())
        } else {
            Box::new(io::sink())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mode_from_str() {
        assert_eq!("verbose".parse::<OutputMode>(), Ok(OutputMode::Verbose));
        assert_eq!("QUIET".parse::<OutputMode>(), Ok(OutputMode::Quiet));
        assert!("invalid".parse::<OutputMode>().is_err());
    }

    #[test]
    fn output_mode_from_flags() {
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Normal);
        assert_eq!(OutputMode::from_flags(false, true), OutputMode::Quiet);
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Verbose);
    }

    #[test]
    fn output_mode_shows_command_output() {
        assert!(OutputMode::Verbose.shows_command_output());
        assert!(OutputMode::Normal.shows_command_output());
        assert!(!OutputMode::Quiet.shows_command_output());
        assert!(!OutputMode::Silent.shows_command_output());
    }

    #[test]
    fn output_mode_shows_status() {
        assert!(OutputMode::Quiet.shows_status());
        assert!(!OutputMode::Silent.shows_status());
    }

    #[test]
    fn no_color_uses_plain_theme() {
        let output = Output::new(OutputMode::Normal, true);
        assert_eq!(output.theme().format_success("ok"), "✓ ok");
        assert_eq!(output.mode(), OutputMode::Normal);
    }
}
