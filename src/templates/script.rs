//! Parsed script template and rendering.

use crate::config::interpolation::{parse_interpolation, Segment};
use crate::error::{ProvisionError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// An immutable, pre-parsed script template.
///
/// Cloning is cheap; clones share the parsed segments, so one template
/// can be rendered from many threads at once.
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    name: Arc<str>,
    source: Arc<str>,
    segments: Arc<[Segment]>,
}

impl ScriptTemplate {
    /// Parse a template.
    pub fn parse(name: &str, source: &str) -> Self {
        Self {
            name: Arc::from(name),
            source: Arc::from(source),
            segments: parse_interpolation(source).into(),
        }
    }

    /// Template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unparsed template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names the template references.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|seg| match seg {
                Segment::Variable(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Render the template against the fields of `data`.
    ///
    /// `data` must serialize to a flat map. Strings are inserted verbatim,
    /// booleans as `true`/`false`, numbers in decimal, and `null` as the
    /// empty string.
    ///
    /// # Errors
    ///
    /// Returns `TemplateRender` if a placeholder names a missing field or
    /// a field that is not a scalar.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        let fields = match serde_json::to_value(data).map_err(|e| self.render_error(e))? {
            Value::Object(fields) => fields,
            _ => return Err(self.render_error("template data must be a struct or map")),
        };

        let mut result = String::with_capacity(self.source.len());
        for segment in self.segments.iter() {
            match segment {
                Segment::Literal(text) => result.push_str(text),
                Segment::Variable(name) => {
                    let value = fields.get(name).ok_or_else(|| {
                        self.render_error(format!("Unresolved variable: ${{{}}}", name))
                    })?;
                    match value {
                        Value::String(s) => result.push_str(s),
                        Value::Bool(b) => result.push_str(if *b { "true" } else { "false" }),
                        Value::Number(n) => result.push_str(&n.to_string()),
                        Value::Null => {}
                        Value::Array(_) | Value::Object(_) => {
                            return Err(
                                self.render_error(format!("Field '{}' is not a scalar", name))
                            );
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    fn render_error(&self, message: impl ToString) -> ProvisionError {
        ProvisionError::TemplateRender {
            name: self.name.to_string(),
            message: message.to_string(),
        }
    }
}
