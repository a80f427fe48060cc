//! Style Resolver
//!
//! Loads named style documents from the run's style directory and
//! deep-merges them into component nodes before any code generation.
//! Merge is right-biased: the node's own properties always beat the
//! style's, object/object recurses, list/list takes the override
//! wholesale, scalar vs anything takes the override.

use std::fs;
use std::sync::Arc;

use crate::context::CompileContext;
use crate::error::Warning;
use crate::tree::{ComponentNode, PropertyMap, PropertyValue};

/// Styles may include styles. Expansion is depth-capped so a cross-style
/// reference cycle degrades into a warning instead of looping forever.
const MAX_STYLE_DEPTH: u32 = 8;

/// Resolves the whole tree, top down. Nodes without a `style` key pass
/// through untouched apart from child recursion, which makes resolution
/// idempotent: a second pass over an already-resolved tree is a no-op.
pub fn resolve_tree(mut node: ComponentNode, ctx: &CompileContext) -> ComponentNode {
    if let Some(style_ref) = node.properties.remove("style") {
        if let Some(name) = style_ref.as_str() {
            if let Some(base) = expand_style(name, 0, ctx) {
                node.properties = deep_merge(base, node.properties);
            }
        }
        // Non-string style references are stripped and ignored, same as a
        // missing document: degraded output beats aborting the file.
    }

    node.children = node
        .children
        .into_iter()
        .map(|child| resolve_tree(child, ctx))
        .collect();
    node
}

/// Loads one style document through the run-scoped cache. The populate
/// closure does file IO and JSON parsing only; warnings for missing or
/// malformed documents fire once per style name per run because negative
/// results are cached as well.
fn load_style(name: &str, ctx: &CompileContext) -> Option<Arc<PropertyMap>> {
    let dir = ctx.style_dir()?.to_path_buf();
    ctx.style_cached(name, || {
        let path = dir.join(format!("{}.json", name));
        if !path.is_file() {
            ctx.warn(Warning::StyleNotFound {
                name: name.to_string(),
            });
            return None;
        }

        let source = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                ctx.warn(Warning::StyleParseError {
                    name: name.to_string(),
                    file: path.display().to_string(),
                    message: e.to_string(),
                });
                return None;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&source) {
            Ok(serde_json::Value::Object(map)) => Some(PropertyMap::from_json(&map)),
            Ok(_) => {
                ctx.warn(Warning::StyleParseError {
                    name: name.to_string(),
                    file: path.display().to_string(),
                    message: "style document must be a JSON object".to_string(),
                });
                None
            }
            Err(e) => {
                ctx.warn(Warning::StyleParseError {
                    name: name.to_string(),
                    file: path.display().to_string(),
                    message: e.to_string(),
                });
                None
            }
        }
    })
}

/// A style's own `style` key is stripped and expanded first, so the nested
/// document becomes the base of the base. Depth is counted per reference
/// chain, not per run.
fn expand_style(name: &str, depth: u32, ctx: &CompileContext) -> Option<PropertyMap> {
    if depth >= MAX_STYLE_DEPTH {
        ctx.warn(Warning::StyleDepthExceeded {
            name: name.to_string(),
            depth: MAX_STYLE_DEPTH,
        });
        return None;
    }

    let doc = load_style(name, ctx)?;
    let mut props = (*doc).clone();

    if let Some(nested_ref) = props.remove("style") {
        if let Some(nested_name) = nested_ref.as_str() {
            if let Some(base) = expand_style(nested_name, depth + 1, ctx) {
                props = deep_merge(base, props);
            }
        }
    }

    Some(props)
}

/// Right-biased recursive merge. Key order of the result: base keys in base
/// order (overridden in place), then override-only keys in override order.
pub fn deep_merge(base: PropertyMap, override_map: PropertyMap) -> PropertyMap {
    let mut merged = base;
    for (key, over) in override_map.iter() {
        let value = match (merged.get(key), over) {
            (Some(PropertyValue::Object(b)), PropertyValue::Object(o)) => {
                PropertyValue::Object(deep_merge(b.clone(), o.clone()))
            }
            // Lists are opaque, scalars and bindings atomic: override wins.
            (_, over) => over.clone(),
        };
        // Insert replaces in place, so an overridden base key keeps its slot.
        merged.insert(key.clone(), value);
    }
    merged
}
