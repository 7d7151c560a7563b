//! Terminal output for the command line.
//!
//! - [`OutputMode`] controls how much is printed
//! - [`Output`] writes status lines to stderr and hands out the script sink
//! - [`KubeprovTheme`] holds the console styles

pub mod output;
pub mod theme;

pub use output::{Output, OutputMode};
pub use theme::{should_use_colors, KubeprovTheme};
