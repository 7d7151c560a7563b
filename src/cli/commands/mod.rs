//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by
//! [`CommandDispatcher`].

pub mod completions;
pub mod dispatcher;
pub mod list;
pub mod run;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};

use std::path::Path;

use crate::error::Result;
use crate::templates::TemplateStore;

/// Built-in templates, overridden by `dir` when given.
fn load_templates(dir: Option<&Path>) -> Result<TemplateStore> {
    let store = TemplateStore::builtin()?;
    match dir {
        Some(dir) => store.with_overrides(dir),
        None => Ok(store),
    }
}
