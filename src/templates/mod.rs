//! Script templates.
//!
//! Step scripts live in `templates/<name>.sh.tpl` and are embedded in the
//! binary at compile time. Each step looks up its template once, when the
//! step registry is bootstrapped, and keeps the parsed [`ScriptTemplate`]
//! for the life of the process.
//!
//! A directory of `*.sh.tpl` files can be layered over the embedded set
//! with [`TemplateStore::with_overrides`]; a file there replaces the
//! embedded template of the same name.
//!
//! # Example
//!
//! ```
//! use kubeprov::templates::TemplateStore;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Vars {
//!     version: String,
//! }
//!
//! let mut store = TemplateStore::new();
//! store.insert("hello", "echo installing ${version}");
//!
//! let template = store.get_template("hello").unwrap();
//! let script = template.render(&Vars { version: "1.0".into() }).unwrap();
//! assert_eq!(script, "echo installing 1.0");
//! ```

mod script;

pub use script::ScriptTemplate;

use crate::error::{ProvisionError, Result};
use include_dir::{include_dir, Dir};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Embedded templates directory.
static TEMPLATES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// File suffix that marks a template.
pub const TEMPLATE_SUFFIX: &str = ".sh.tpl";

/// Lookup-by-name source of parsed script templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, ScriptTemplate>,
}

impl TemplateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the templates embedded in the binary.
    pub fn builtin() -> Result<Self> {
        let mut store = Self::new();

        for file in TEMPLATES_DIR.files() {
            let Some(name) = file
                .path()
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(template_name)
            else {
                continue;
            };

            let content =
                file.contents_utf8()
                    .ok_or_else(|| ProvisionError::ConfigParseError {
                        path: file.path().to_path_buf(),
                        message: "Invalid UTF-8".to_string(),
                    })?;

            store.insert(name, content);
        }

        tracing::debug!("Loaded {} embedded templates", store.len());
        Ok(store)
    }

    /// Layer templates from `dir` over the current set.
    pub fn with_overrides(mut self, dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ProvisionError::ConfigNotFound {
                path: dir.to_path_buf(),
            });
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(template_name)
            else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            tracing::debug!("Template '{}' overridden from {}", name, path.display());
            self.insert(name, &content);
        }

        Ok(self)
    }

    /// Parse `source` and store it under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: &str, source: &str) {
        self.templates
            .insert(name.to_string(), ScriptTemplate::parse(name, source));
    }

    /// Get a template by name.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound` if no template has that name.
    pub fn get_template(&self, name: &str) -> Result<ScriptTemplate> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| ProvisionError::TemplateNotFound {
                name: name.to_string(),
            })
    }

    /// Check if a template exists.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(|s| s.as_str()).collect()
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn template_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(TEMPLATE_SUFFIX)
        .filter(|name| !name.is_empty())
}
