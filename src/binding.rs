use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Full-string `@{...}` wrapper only. Partial interpolation is not a
    /// binding; it passes through the pipeline as a literal.
    static ref BINDING_RE: Regex = Regex::new(r"(?s)^@\{(.*)\}$").unwrap();
}

/// A `@{path}` token referencing external reactive state. The path is taken
/// verbatim; a dangling path is a runtime concern, not a compile-time one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingExpression {
    pub path: String,
}

impl BindingExpression {
    pub fn parse(raw: &str) -> Option<BindingExpression> {
        BINDING_RE.captures(raw).map(|cap| BindingExpression {
            path: cap[1].to_string(),
        })
    }
}

pub fn is_binding(raw: &str) -> bool {
    BINDING_RE.is_match(raw)
}
