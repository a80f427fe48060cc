//! Compile driver
//!
//! Per-file pipeline: JSON → style resolution → z-order lowering → handler
//! dispatch (depth-first) → assembly. One file compiles synchronously on
//! one thread; multiple files fan out over rayon and share only the
//! read-only, run-scoped style cache on the context.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::assemble::{self, CompiledUnit};
use crate::cache::OutputCache;
use crate::context::CompileContext;
use crate::error::{CompileError, CompileResult, Warning};
use crate::handlers;
use crate::style;
use crate::tree::ComponentNode;
use crate::zorder;

/// Everything emitted for one layout tree: per-component units plus their
/// depth-first concatenation, which is what gets handed to the writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledOutput {
    pub units: Vec<CompiledUnit>,
    pub text: String,
}

pub fn compile_source(
    source: &str,
    path: &str,
    ctx: &CompileContext,
) -> CompileResult<CompiledOutput> {
    // A top-level parse failure is fatal, but only for this file.
    let document: serde_json::Value =
        serde_json::from_str(source).map_err(|e| CompileError::JsonError {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    let tree = ComponentNode::from_json(&document)?;
    let mut tree = style::resolve_tree(tree, ctx);
    zorder::resolve_tree(&mut tree);
    check_id_uniqueness(&tree, ctx);

    let mut units = Vec::new();
    let mut counter = 0usize;
    emit_node(&tree, ctx, &mut counter, &mut units);

    let text = units
        .iter()
        .map(|u| u.code.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    log::debug!("compiled {}: {} units", path, units.len());
    Ok(CompiledOutput { units, text })
}

pub fn compile_file(path: &Path, ctx: &CompileContext) -> CompileResult<CompiledOutput> {
    let source = fs::read_to_string(path).map_err(|e| CompileError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let key = path.to_string_lossy();
    if let Some(cache_dir) = &ctx.options().cache_dir {
        let cache = OutputCache::new(cache_dir.clone());
        let style_digest = ctx.style_digest();
        if let Some(output) = cache.get(&key, &source, ctx.mode(), style_digest) {
            log::debug!("cache hit for {}", key);
            return Ok(output);
        }
        let output = compile_source(&source, &key, ctx)?;
        cache.set(&key, &source, ctx.mode(), style_digest, &output);
        return Ok(output);
    }

    compile_source(&source, &key, ctx)
}

/// Compiles many files as independent tasks. Results come back pairwise;
/// the enclosing CLI aggregates warnings and decides the exit code when
/// some file produced no output at all.
pub fn compile_files(
    paths: &[PathBuf],
    ctx: &CompileContext,
) -> Vec<(PathBuf, CompileResult<CompiledOutput>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), compile_file(path, ctx)))
        .collect()
}

/// Recursively finds layout documents under a directory. The enclosing CLI
/// feeds the result to `compile_files`.
pub fn find_layout_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        if let Ok(entry) = entry {
            let path = entry.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files
}

/// Node ids are the targets of relative positioning and binding references;
/// a collision keeps the last writer, matching the z-order map's
/// last-writer-per-id rule, but is worth a warning.
fn check_id_uniqueness(tree: &ComponentNode, ctx: &CompileContext) {
    let mut seen: HashSet<&str> = HashSet::new();
    tree.walk(&mut |node| {
        if let Some(id) = &node.id {
            if !seen.insert(id) {
                ctx.warn(Warning::DuplicateId { id: id.clone() });
            }
        }
    });
}

fn emit_node(
    node: &ComponentNode,
    ctx: &CompileContext,
    counter: &mut usize,
    units: &mut Vec<CompiledUnit>,
) {
    let handler = match handlers::lookup(&node.kind) {
        Some(handler) => handler,
        None => {
            ctx.warn(Warning::UnknownComponentType {
                kind: node.kind.clone(),
            });
            handlers::default_handler()
        }
    };

    let target_key = match &node.id {
        Some(id) => id.clone(),
        None => format!("{}_{}", node.kind.to_lowercase(), *counter),
    };
    *counter += 1;

    let fragments = handlers::dispatch(handler, node, ctx.mode());
    let constructor = handler.constructor(node);
    units.push(assemble::assemble(
        node,
        constructor,
        fragments,
        ctx.mode(),
        &target_key,
    ));

    for child in &node.children {
        emit_node(child, ctx, counter, units);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CompileOptions, OutputMode};
    use serde_json::json;

    fn ctx(mode: OutputMode) -> CompileContext {
        CompileContext::new(CompileOptions::new(mode))
    }

    #[test]
    fn test_invalid_json_is_fatal_for_the_file() {
        let err = compile_source("{ nope", "bad.json", &ctx(OutputMode::Declarative)).unwrap_err();
        assert!(matches!(err, CompileError::JsonError { .. }));
    }

    #[test]
    fn test_units_are_emitted_depth_first() {
        let source = json!({
            "type": "Stack",
            "children": [
                { "type": "Label", "text": "a", "children": [{ "type": "Image" }] },
                { "type": "Button", "title": "b" }
            ]
        })
        .to_string();
        let output = compile_source(&source, "t.json", &ctx(OutputMode::Declarative)).unwrap();
        let kinds: Vec<&str> = output.units.iter().map(|u| u.kind.as_str()).collect();
        assert_eq!(kinds, vec!["Stack", "Label", "Image", "Button"]);
    }

    #[test]
    fn test_unknown_type_warns_and_still_emits_common() {
        let source = json!({ "type": "Gizmo", "opacity": "@{fade}" }).to_string();
        let c = ctx(OutputMode::Declarative);
        let output = compile_source(&source, "t.json", &c).unwrap();
        assert!(output.units[0].code.contains(".opacity(model.fade)"));
        assert!(matches!(
            c.warnings()[0],
            Warning::UnknownComponentType { .. }
        ));
    }

    #[test]
    fn test_duplicate_ids_warn() {
        let source = json!({
            "type": "Stack",
            "id": "x",
            "children": [{ "type": "Label", "id": "x" }]
        })
        .to_string();
        let c = ctx(OutputMode::Imperative);
        compile_source(&source, "t.json", &c).unwrap();
        assert!(c
            .warnings()
            .iter()
            .any(|w| matches!(w, Warning::DuplicateId { .. })));
    }

    #[test]
    fn test_find_layout_files_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("sub/a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = find_layout_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.json"));
        assert!(files[1].ends_with("sub/a.json"));
    }

    #[test]
    fn test_generated_target_keys_for_anonymous_nodes() {
        let source = json!({
            "type": "Stack",
            "children": [{ "type": "Label", "id": "named" }, { "type": "Label" }]
        })
        .to_string();
        let output = compile_source(&source, "t.json", &ctx(OutputMode::Imperative)).unwrap();
        assert_eq!(output.units[0].target_key, "stack_0");
        assert_eq!(output.units[1].target_key, "named");
        assert_eq!(output.units[2].target_key, "label_2");
    }
}
