//! Placeholder parsing for script templates.
//!
//! Templates reference tool config fields using `${field}` syntax.
//!
//! # Syntax
//!
//! - `${field_name}` - replaced with the field's value
//! - `$${escaped}` - produces literal `${escaped}` in output, which is how
//!   shell variables are written inside a template
//! - `$` not followed by `{` is kept as-is, so `$HOME` and `$$` need no
//!   escaping
//!
//! # Example
//!
//! ```sh
//! kubeadm init --apiserver-advertise-address=${advertise_address}
//! # With advertise_address="10.0.0.5", produces:
//! # kubeadm init --apiserver-advertise-address=10.0.0.5
//! ```

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Placeholder reference: ${name}
    Variable(String),
}

/// Parse a string containing `${name}` placeholders.
///
/// An unterminated `${` is kept as literal text.
pub fn parse_interpolation(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current_literal = String::new();

    while let Some(c) = chars.next() {
        if c != '$' {
            current_literal.push(c);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                chars.next();
                if chars.peek() == Some(&'{') {
                    // $${...} -> literal ${...}
                    chars.next();
                    current_literal.push_str("${");
                    for c in chars.by_ref() {
                        current_literal.push(c);
                        if c == '}' {
                            break;
                        }
                    }
                } else {
                    current_literal.push_str("$$");
                }
            }
            Some('{') => {
                chars.next();

                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }

                if closed {
                    if !current_literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                    }
                    segments.push(Segment::Variable(name.trim().to_string()));
                } else {
                    current_literal.push_str("${");
                    current_literal.push_str(&name);
                }
            }
            _ => current_literal.push(c),
        }
    }

    if !current_literal.is_empty() {
        segments.push(Segment::Literal(current_literal));
    }

    segments
}
