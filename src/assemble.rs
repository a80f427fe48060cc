//! Code Assembler
//!
//! Concatenates the ordered fragments of one component into its output
//! unit: a chained-modifier expression in declarative mode, or a sequence
//! of statements against a possibly-absent live target in imperative mode.
//! Fragments are never reordered or deduplicated; duplicates are kept on
//! purpose so the last one wins at runtime.

use serde::{Deserialize, Serialize};

use crate::context::OutputMode;
use crate::tree::ComponentNode;

/// One unit of emitted code: a modifier expression or a guarded statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Source property this fragment was emitted for.
    pub property: String,
    pub code: String,
}

impl Fragment {
    pub fn new(property: &str, code: impl Into<String>) -> Fragment {
        Fragment {
            property: property.to_string(),
            code: code.into(),
        }
    }
}

/// Emitted source for one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledUnit {
    pub kind: String,
    pub id: Option<String>,
    /// Key the imperative runtime looks the live view up under.
    pub target_key: String,
    pub code: String,
}

pub fn assemble(
    node: &ComponentNode,
    constructor: String,
    fragments: Vec<Fragment>,
    mode: OutputMode,
    target_key: &str,
) -> CompiledUnit {
    let code = match mode {
        OutputMode::Declarative => assemble_declarative(constructor, &fragments),
        OutputMode::Imperative => assemble_imperative(node, &fragments, target_key),
    };

    CompiledUnit {
        kind: node.kind.clone(),
        id: node.id.clone(),
        target_key: target_key.to_string(),
        code,
    }
}

fn assemble_declarative(constructor: String, fragments: &[Fragment]) -> String {
    let mut code = constructor;
    for fragment in fragments {
        code.push_str("\n    ");
        code.push_str(&fragment.code);
    }
    code
}

/// The `target` lookup may come back empty; every statement the handlers
/// emit chains through `target?.`, so a missing live view is a no-op
/// rather than a fault.
fn assemble_imperative(node: &ComponentNode, fragments: &[Fragment], target_key: &str) -> String {
    let mut code = format!(
        "// {}\nlet target = views[\"{}\"]",
        node.kind, target_key
    );
    for fragment in fragments {
        code.push('\n');
        code.push_str(&fragment.code);
    }
    code
}
