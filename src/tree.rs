//! Component Tree Model
//!
//! Normalized in-memory form of one parsed layout: type key, ordered
//! property map, ordered children. Built fresh per input file per run,
//! immutable once style resolution is done, discarded after assembly.

use serde_json::Value;

use crate::binding::BindingExpression;
use crate::error::{CompileError, CompileResult};

/// Closed tagged union over everything a property can hold. Lists are
/// opaque: merge replaces them wholesale, never concatenates.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(Value),
    Binding(BindingExpression),
    Object(PropertyMap),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Bindings are recognized here, once, so every later phase reuses the
    /// parsed path instead of re-matching the raw string.
    pub fn from_json(value: &Value) -> PropertyValue {
        match value {
            Value::String(s) => match BindingExpression::parse(s) {
                Some(binding) => PropertyValue::Binding(binding),
                None => PropertyValue::Scalar(value.clone()),
            },
            Value::Object(map) => PropertyValue::Object(PropertyMap::from_json(map)),
            Value::Array(items) => {
                PropertyValue::List(items.iter().map(PropertyValue::from_json).collect())
            }
            other => PropertyValue::Scalar(other.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_binding(&self) -> Option<&BindingExpression> {
        match self {
            PropertyValue::Binding(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Scalar(Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Scalar(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Insertion-ordered property map. Iteration order equals source JSON order;
/// replacing an existing key keeps its position, so fragment emission can
/// rely on the author's ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyMap {
    pub fn new() -> PropertyMap {
        PropertyMap::default()
    }

    /// Requires serde_json's `preserve_order` feature so the serde map
    /// iterates in document order.
    pub fn from_json(map: &serde_json::Map<String, Value>) -> PropertyMap {
        let mut props = PropertyMap::new();
        for (key, value) in map {
            props.insert(key.clone(), PropertyValue::from_json(value));
        }
        props
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Existing key: value replaced in place, position kept. New key:
    /// appended at the end.
    pub fn insert(&mut self, key: String, value: PropertyValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Renames a key in place without moving it. Used when the z-order pass
    /// lowers `above`/`below` into a resolved `zIndex` at the same position.
    pub fn replace_key(&mut self, key: &str, new_key: &str, value: PropertyValue) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => {
                entry.0 = new_key.to_string();
                entry.1 = value;
            }
            None => self.insert(new_key.to_string(), value),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One node of the layout tree. `kind` is the case-insensitive dispatch key
/// (the JSON `type`); `id` is the target for relative z-order and binding
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    pub kind: String,
    pub id: Option<String>,
    pub properties: PropertyMap,
    pub children: Vec<ComponentNode>,
}

impl ComponentNode {
    /// Normalizes a parsed JSON document into a tree. The root must be an
    /// object carrying a `type`; malformed nested nodes are dropped with a
    /// debug log instead of failing the file.
    pub fn from_json(value: &Value) -> CompileResult<ComponentNode> {
        match Self::from_json_node(value) {
            Some(node) => Ok(node),
            None => Err(CompileError::InvalidRoot),
        }
    }

    fn from_json_node(value: &Value) -> Option<ComponentNode> {
        let map = value.as_object()?;
        let kind = map.get("type")?.as_str()?.to_string();

        let mut id = None;
        let mut properties = PropertyMap::new();
        let mut children = Vec::new();

        for (key, val) in map {
            match key.as_str() {
                "type" => {}
                "id" => id = val.as_str().map(|s| s.to_string()),
                // Both the singular and plural container are accepted, and
                // both are collected independently when present together.
                "child" | "children" => children.extend(Self::parse_children(val)),
                _ => properties.insert(key.clone(), PropertyValue::from_json(val)),
            }
        }

        Some(ComponentNode {
            kind,
            id,
            properties,
            children,
        })
    }

    fn parse_children(value: &Value) -> Vec<ComponentNode> {
        let candidates: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };

        let mut children = Vec::new();
        for candidate in candidates {
            match Self::from_json_node(candidate) {
                Some(node) => children.push(node),
                None => log::debug!("dropping child without a 'type' key: {}", candidate),
            }
        }
        children
    }

    /// Depth-first visit, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ComponentNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_order_matches_source() {
        let doc = json!({
            "type": "Label",
            "text": "hi",
            "fontSize": 12,
            "opacity": 1.0
        });
        let node = ComponentNode::from_json(&doc).unwrap();
        let keys: Vec<&String> = node.properties.keys().collect();
        assert_eq!(keys, vec!["text", "fontSize", "opacity"]);
    }

    #[test]
    fn test_insert_existing_keeps_position() {
        let mut map = PropertyMap::new();
        map.insert("a".into(), PropertyValue::Scalar(json!(1)));
        map.insert("b".into(), PropertyValue::Scalar(json!(2)));
        map.insert("a".into(), PropertyValue::Scalar(json!(9)));
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a").unwrap().as_i64(), Some(9));
    }

    #[test]
    fn test_binding_recognized_once_at_normalization() {
        let doc = json!({ "type": "Label", "text": "@{title}", "hint": "not @{a} binding" });
        let node = ComponentNode::from_json(&doc).unwrap();
        assert_eq!(
            node.properties.get("text").unwrap().as_binding().unwrap().path,
            "title"
        );
        assert!(node.properties.get("hint").unwrap().as_binding().is_none());
    }

    #[test]
    fn test_child_and_children_both_collected() {
        let doc = json!({
            "type": "Stack",
            "child": { "type": "Label", "text": "a" },
            "children": [
                { "type": "Label", "text": "b" },
                { "type": "Label", "text": "c" }
            ]
        });
        let node = ComponentNode::from_json(&doc).unwrap();
        assert_eq!(node.children.len(), 3);
        assert_eq!(node.children[0].properties.get("text").unwrap().as_str(), Some("a"));
    }

    #[test]
    fn test_single_object_children_container() {
        let doc = json!({
            "type": "Stack",
            "children": { "type": "Label" }
        });
        let node = ComponentNode::from_json(&doc).unwrap();
        assert_eq!(node.children.len(), 1);
    }

    #[test]
    fn test_nested_child_without_type_is_dropped() {
        let doc = json!({
            "type": "Stack",
            "children": [{ "text": "no type" }, { "type": "Label" }]
        });
        let node = ComponentNode::from_json(&doc).unwrap();
        assert_eq!(node.children.len(), 1);
    }

    #[test]
    fn test_root_without_type_is_fatal() {
        assert!(ComponentNode::from_json(&json!({ "text": "x" })).is_err());
        assert!(ComponentNode::from_json(&json!([1, 2])).is_err());
    }
}
