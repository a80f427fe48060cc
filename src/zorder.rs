//! Relative Z-Order Resolution
//!
//! A node may say `above: "<sibling id>"` or `below: "<sibling id>"`
//! instead of declaring an absolute `zIndex`. Where the references are
//! statically known this pass resolves them at compile time as an explicit
//! fixed-point computation over the sibling id graph and lowers the
//! relative key to a `zIndex` at the same property position. Binding-valued
//! references cannot be resolved here; they stay in place and the handlers
//! emit the runtime convergence form instead.

use std::collections::HashMap;

use serde_json::json;

use crate::tree::{ComponentNode, PropertyValue};

/// Unresolved references settle on a fixed offset instead of blocking.
pub const UNRESOLVED_ABOVE: i64 = 1;
pub const UNRESOLVED_BELOW: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ref {
    Above,
    Below,
}

impl Ref {
    fn offset(self) -> i64 {
        match self {
            Ref::Above => 1,
            Ref::Below => -1,
        }
    }
}

/// Resolves every sibling group in the tree, parents first.
pub fn resolve_tree(node: &mut ComponentNode) {
    resolve_siblings(&mut node.children);
    for child in &mut node.children {
        resolve_tree(child);
    }
}

/// One sibling group. The shared map holds the latest published value per
/// id (last writer wins); every relative node recomputes from the current
/// map each round until nothing changes. Deep reference chains need one
/// round per link, so the round cap is the group size plus one.
fn resolve_siblings(siblings: &mut [ComponentNode]) {
    let mut published: HashMap<String, i64> = HashMap::new();
    let mut values = vec![0i64; siblings.len()];
    let mut relative: Vec<Option<(Ref, String)>> = Vec::with_capacity(siblings.len());

    for (i, node) in siblings.iter().enumerate() {
        if let Some(z) = node.properties.get("zIndex").and_then(|v| v.as_i64()) {
            values[i] = z;
        }
        relative.push(static_reference(node));
        if let Some(id) = &node.id {
            published.insert(id.clone(), values[i]);
        }
    }

    if relative.iter().all(|r| r.is_none()) {
        return;
    }

    let rounds = siblings.len() + 1;
    for _ in 0..rounds {
        let mut changed = false;
        for (i, node) in siblings.iter().enumerate() {
            let Some((dir, target)) = &relative[i] else {
                continue;
            };
            let next = match published.get(target) {
                Some(base) => base + dir.offset(),
                None => dir.offset(),
            };
            if next != values[i] {
                values[i] = next;
                changed = true;
            }
            if let Some(id) = &node.id {
                published.insert(id.clone(), values[i]);
            }
        }
        if !changed {
            break;
        }
    }

    for (i, node) in siblings.iter_mut().enumerate() {
        let Some((dir, _)) = &relative[i] else {
            continue;
        };
        let key = match dir {
            Ref::Above => "above",
            Ref::Below => "below",
        };
        node.properties
            .replace_key(key, "zIndex", PropertyValue::Scalar(json!(values[i])));
    }
}

/// Only scalar string references are statically resolvable. A binding
/// reference is left for the runtime convergence path.
fn static_reference(node: &ComponentNode) -> Option<(Ref, String)> {
    for (key, dir) in [("above", Ref::Above), ("below", Ref::Below)] {
        match node.properties.get(key) {
            Some(PropertyValue::Scalar(serde_json::Value::String(id))) => {
                return Some((dir, id.clone()));
            }
            Some(PropertyValue::Binding(_)) => return None,
            _ => {}
        }
    }
    None
}
