//! Handler Registry & Handlers
//!
//! Per-component-type strategies turning property key/value pairs into
//! ordered code fragments. Dispatch per property is `handle_common` first
//! (cross-type properties), then `handle_specific` if common declined;
//! either may decline, and a key matched by neither is silently skipped
//! from the binding pipeline. Unknown type keys resolve to an explicit
//! default handler that supports common properties only.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde_json::Value;

use crate::assemble::Fragment;
use crate::context::OutputMode;
use crate::tree::{ComponentNode, PropertyValue};

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only view of the node a property is being emitted for. Handlers
/// need it for cross-property semantics (font read-modify-write, selector
/// prompt shift).
pub struct HandlerCx<'a> {
    pub mode: OutputMode,
    pub node: &'a ComponentNode,
}

pub trait Handler: Sync + Send {
    /// Declarative-mode constructor head for this component kind.
    fn constructor(&self, node: &ComponentNode) -> String {
        format!("{}()", pascal_kind(&node.kind))
    }

    fn handle_common(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        common_fragments(prop, value, cx)
    }

    fn handle_specific(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>>;
}

/// Runs one node's property map through a handler in source order.
/// Emitted fragment order equals property order regardless of which phase
/// produced each fragment; later fragments may depend on the side effects
/// of earlier ones.
pub fn dispatch(handler: &dyn Handler, node: &ComponentNode, mode: OutputMode) -> Vec<Fragment> {
    let cx = HandlerCx { mode, node };
    let mut fragments = Vec::new();
    for (prop, value) in node.properties.iter() {
        if let Some(emitted) = handler.handle_common(prop, value, &cx) {
            fragments.extend(emitted);
        } else if let Some(emitted) = handler.handle_specific(prop, value, &cx) {
            fragments.extend(emitted);
        }
        // Matched by neither phase: not part of the binding pipeline.
    }
    fragments
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

static TEXT_HANDLER: TextHandler = TextHandler;
static TOGGLE_HANDLER: ToggleHandler = ToggleHandler;
static SELECTOR_HANDLER: SelectorHandler = SelectorHandler;
static BUTTON_HANDLER: ButtonHandler = ButtonHandler;
static IMAGE_HANDLER: ImageHandler = ImageHandler;
static SLIDER_HANDLER: SliderHandler = SliderHandler;
static STACK_HANDLER: StackHandler = StackHandler;
static DEFAULT_HANDLER: DefaultHandler = DefaultHandler;

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, &'static dyn Handler> = {
        let mut m: HashMap<&'static str, &'static dyn Handler> = HashMap::new();
        // Several type keys alias one handler.
        for key in ["label", "text", "textfield", "textinput", "textview", "textarea"] {
            m.insert(key, &TEXT_HANDLER);
        }
        for key in ["toggle", "switch", "checkbox"] {
            m.insert(key, &TOGGLE_HANDLER);
        }
        for key in ["picker", "selector", "dropdown", "segmented"] {
            m.insert(key, &SELECTOR_HANDLER);
        }
        m.insert("button", &BUTTON_HANDLER);
        for key in ["image", "icon"] {
            m.insert(key, &IMAGE_HANDLER);
        }
        for key in ["slider", "progress", "progressbar"] {
            m.insert(key, &SLIDER_HANDLER);
        }
        for key in ["stack", "vstack", "hstack", "zstack", "row", "column", "view", "container"] {
            m.insert(key, &STACK_HANDLER);
        }
        m
    };
}

/// Case-folded lookup. `None` means the caller should warn and fall back.
pub fn lookup(kind: &str) -> Option<&'static dyn Handler> {
    REGISTRY.get(kind.to_lowercase().as_str()).copied()
}

pub fn default_handler() -> &'static dyn Handler {
    &DEFAULT_HANDLER
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUE RENDERING
// ═══════════════════════════════════════════════════════════════════════════════

/// Renders any property value as a target-language expression. Bindings
/// become live `model.<path>` references; everything else is a literal.
pub fn render_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Binding(b) => format!("model.{}", b.path),
        PropertyValue::Scalar(scalar) => render_scalar(scalar),
        PropertyValue::Object(map) => {
            if map.is_empty() {
                return "[:]".to_string();
            }
            let pairs: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("\"{}\": {}", escape_string(k), render_value(v)))
                .collect();
            format!("[{}]", pairs.join(", "))
        }
        PropertyValue::List(items) => {
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", rendered.join(", "))
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", escape_string(s)),
        Value::Null => "nil".to_string(),
        other => other.to_string(),
    }
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn pascal_kind(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMON PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

fn common_fragments(prop: &str, value: &PropertyValue, cx: &HandlerCx) -> Option<Vec<Fragment>> {
    let x = render_value(value);
    let code = match (prop, cx.mode) {
        ("background", OutputMode::Declarative) => format!(".background({})", x),
        ("background", OutputMode::Imperative) => format!("target?.backgroundColor = {}", x),
        ("opacity", OutputMode::Declarative) => format!(".opacity({})", x),
        ("opacity", OutputMode::Imperative) => format!("target?.alpha = {}", x),
        ("hidden", OutputMode::Declarative) => format!(".hidden({})", x),
        ("hidden", OutputMode::Imperative) => format!("target?.isHidden = {}", x),
        ("enabled", OutputMode::Declarative) => format!(".enabled({})", x),
        ("enabled", OutputMode::Imperative) => format!("target?.isEnabled = {}", x),
        ("cornerRadius", OutputMode::Declarative) => format!(".cornerRadius({})", x),
        ("cornerRadius", OutputMode::Imperative) => {
            format!("target?.layer.cornerRadius = {}", x)
        }
        ("padding", OutputMode::Declarative) => format!(".padding({})", x),
        ("padding", OutputMode::Imperative) => format!("target?.padding = {}", x),
        ("zIndex", OutputMode::Declarative) => format!(".zIndex({})", x),
        ("zIndex", OutputMode::Imperative) => format!("target?.zPosition = {}", x),
        ("above", _) => return Some(relative_order_fragments(prop, value, 1, cx)),
        ("below", _) => return Some(relative_order_fragments(prop, value, -1, cx)),
        _ => return None,
    };
    Some(vec![Fragment::new(prop, code)])
}

/// Runtime convergence form for relative z-order. Statically known sibling
/// references were already lowered to `zIndex` before dispatch, so this
/// path only sees binding-valued references (dynamically instantiated
/// subtrees) plus the stray scalar that survived lowering, which settles
/// on the sentinel offset.
fn relative_order_fragments(
    prop: &str,
    value: &PropertyValue,
    offset: i64,
    cx: &HandlerCx,
) -> Vec<Fragment> {
    let reference = match value {
        PropertyValue::Binding(b) => format!("model.{}", b.path),
        other => render_value(other),
    };
    let recompute = format!("(orderMap[{}] ?? 0) + ({})", reference, offset);

    match cx.mode {
        OutputMode::Declarative => vec![Fragment::new(
            prop,
            format!(".zIndex({})", recompute),
        )],
        OutputMode::Imperative => {
            // Publish own value keyed by id, recompute on every map change.
            // The recompute inside onChange republishes too, otherwise a
            // chain of dynamic references stalls after one hop: dependents
            // would keep reading this node's initial value.
            let mut fragments = vec![Fragment::new(
                prop,
                format!("target?.zPosition = {}", recompute),
            )];
            let republish = cx
                .node
                .id
                .as_ref()
                .map(|id| format!("orderMap[\"{}\"] = target?.zPosition ?? 0", escape_string(id)));
            if let Some(republish) = &republish {
                fragments.push(Fragment::new(prop, republish.clone()));
            }
            let on_change = match &republish {
                Some(republish) => format!(
                    "orderMap.onChange {{ target?.zPosition = {}; {} }}",
                    recompute, republish
                ),
                None => format!("orderMap.onChange {{ target?.zPosition = {} }}", recompute),
            };
            fragments.push(Fragment::new(prop, on_change));
            fragments
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FONT (read-modify-write of the compound attribute)
// ═══════════════════════════════════════════════════════════════════════════════

/// Default point size, per the target platform's conventions. Nodes in a
/// body context fall back to 17 instead of 14.
fn default_font_size(node: &ComponentNode) -> i64 {
    match node.properties.get("context").and_then(|v| v.as_str()) {
        Some("body") => 17,
        _ => 14,
    }
}

/// Setting family must preserve the size set before it and vice versa, so
/// every font fragment re-applies the whole compound attribute. When both
/// sub-properties are declared on one node, each emission reads the other
/// from the node; in imperative mode the live attribute is read back
/// instead, falling back to the default.
fn font_fragments(prop: &str, value: &PropertyValue, cx: &HandlerCx) -> Option<Vec<Fragment>> {
    let node = cx.node;
    let default_size = default_font_size(node);
    let x = render_value(value);

    let code = match (prop, cx.mode) {
        ("fontFamily", OutputMode::Declarative) => {
            let size = node
                .properties
                .get("fontSize")
                .map(render_value)
                .unwrap_or_else(|| default_size.to_string());
            format!(".font(Font(family: {}, size: {}))", x, size)
        }
        ("fontFamily", OutputMode::Imperative) => format!(
            "target?.font = Font(family: {}, size: target?.font?.pointSize ?? {})",
            x, default_size
        ),
        ("fontSize", OutputMode::Declarative) => {
            let family = node
                .properties
                .get("fontFamily")
                .map(render_value)
                .unwrap_or_else(|| "Font.systemFamily".to_string());
            format!(".font(Font(family: {}, size: {}))", family, x)
        }
        ("fontSize", OutputMode::Imperative) => format!(
            "target?.font = Font(family: target?.font?.family ?? Font.systemFamily, size: {})",
            x
        ),
        ("font", _) => {
            // Compound object form: both sub-attributes applied at once.
            let (family, size) = match value {
                PropertyValue::Object(map) => (
                    map.get("family")
                        .map(render_value)
                        .unwrap_or_else(|| "Font.systemFamily".to_string()),
                    map.get("size")
                        .map(render_value)
                        .unwrap_or_else(|| default_size.to_string()),
                ),
                other => (render_value(other), default_size.to_string()),
            };
            match cx.mode {
                OutputMode::Declarative => {
                    format!(".font(Font(family: {}, size: {}))", family, size)
                }
                OutputMode::Imperative => {
                    format!("target?.font = Font(family: {}, size: {})", family, size)
                }
            }
        }
        _ => return None,
    };
    Some(vec![Fragment::new(prop, code)])
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPE HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Text-like components. Initial text and initial selection apply once at
/// construction; in imperative mode every later re-application is wrapped
/// in an "if not yet initialized" guard so a live view's edited content is
/// never clobbered by a data refresh.
struct TextHandler;

fn deferred_initial(prop: &str, assignment: String, cx: &HandlerCx) -> Vec<Fragment> {
    match cx.mode {
        OutputMode::Declarative => vec![Fragment::new(prop, assignment)],
        OutputMode::Imperative => vec![Fragment::new(
            prop,
            format!("if target?.isInitialized != true {{ {} }}", assignment),
        )],
    }
}

impl Handler for TextHandler {
    fn constructor(&self, node: &ComponentNode) -> String {
        match node.kind.to_lowercase().as_str() {
            "textfield" | "textinput" => "TextField()".to_string(),
            "textview" | "textarea" => "TextView()".to_string(),
            _ => "Text()".to_string(),
        }
    }

    fn handle_specific(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        if let Some(fragments) = font_fragments(prop, value, cx) {
            return Some(fragments);
        }
        let x = render_value(value);
        let fragments = match (prop, cx.mode) {
            ("text", OutputMode::Declarative) => deferred_initial(prop, format!(".text({})", x), cx),
            ("text", OutputMode::Imperative) => {
                deferred_initial(prop, format!("target?.text = {}", x), cx)
            }
            ("selection", OutputMode::Declarative) => {
                deferred_initial(prop, format!(".selection({})", x), cx)
            }
            ("selection", OutputMode::Imperative) => {
                deferred_initial(prop, format!("target?.selectedRange = {}", x), cx)
            }
            ("placeholder", OutputMode::Declarative) => {
                vec![Fragment::new(prop, format!(".placeholder({})", x))]
            }
            ("placeholder", OutputMode::Imperative) => {
                vec![Fragment::new(prop, format!("target?.placeholder = {}", x))]
            }
            ("textColor", OutputMode::Declarative) => {
                vec![Fragment::new(prop, format!(".foregroundColor({})", x))]
            }
            ("textColor", OutputMode::Imperative) => {
                vec![Fragment::new(prop, format!("target?.textColor = {}", x))]
            }
            ("alignment", OutputMode::Declarative) => {
                vec![Fragment::new(prop, format!(".multilineTextAlignment({})", x))]
            }
            ("alignment", OutputMode::Imperative) => {
                vec![Fragment::new(prop, format!("target?.textAlignment = {}", x))]
            }
            _ => return None,
        };
        Some(fragments)
    }
}

/// Boolean enable/disable and checked-state mapping. No deferred guard:
/// toggles track data directly.
struct ToggleHandler;

impl Handler for ToggleHandler {
    fn constructor(&self, _node: &ComponentNode) -> String {
        "Toggle()".to_string()
    }

    fn handle_specific(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        let x = render_value(value);
        let code = match (prop, cx.mode) {
            ("checked" | "isOn" | "value", OutputMode::Declarative) => format!(".checked({})", x),
            ("checked" | "isOn" | "value", OutputMode::Imperative) => {
                format!("target?.isOn = {}", x)
            }
            _ => return None,
        };
        Some(vec![Fragment::new(prop, code)])
    }
}

/// Selectors shift the bound index by one when a prompt placeholder
/// occupies row zero and is not excluded from binding.
struct SelectorHandler;

impl SelectorHandler {
    fn index_expr(value: &PropertyValue, node: &ComponentNode) -> String {
        let x = render_value(value);
        let has_prompt = node.properties.contains_key("prompt");
        let excluded = node
            .properties
            .get("promptExcluded")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if has_prompt && !excluded {
            format!("({}) + 1", x)
        } else {
            x
        }
    }
}

impl Handler for SelectorHandler {
    fn constructor(&self, _node: &ComponentNode) -> String {
        "Picker()".to_string()
    }

    fn handle_specific(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        let fragments = match (prop, cx.mode) {
            ("items", OutputMode::Declarative) => {
                vec![Fragment::new(prop, format!(".items({})", render_value(value)))]
            }
            ("items", OutputMode::Imperative) => vec![Fragment::new(
                prop,
                format!("target?.setItems({})", render_value(value)),
            )],
            ("prompt", OutputMode::Declarative) => {
                vec![Fragment::new(prop, format!(".prompt({})", render_value(value)))]
            }
            ("prompt", OutputMode::Imperative) => vec![Fragment::new(
                prop,
                format!("target?.prompt = {}", render_value(value)),
            )],
            ("selectedIndex", OutputMode::Declarative) => vec![Fragment::new(
                prop,
                format!(".selectedIndex({})", Self::index_expr(value, cx.node)),
            )],
            ("selectedIndex", OutputMode::Imperative) => vec![Fragment::new(
                prop,
                format!("target?.selectedIndex = {}", Self::index_expr(value, cx.node)),
            )],
            // Consumed as a flag by the index computation; emits nothing.
            ("promptExcluded", _) => Vec::new(),
            _ => return None,
        };
        Some(fragments)
    }
}

struct ButtonHandler;

impl Handler for ButtonHandler {
    fn constructor(&self, _node: &ComponentNode) -> String {
        "Button()".to_string()
    }

    fn handle_specific(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        if let Some(fragments) = font_fragments(prop, value, cx) {
            return Some(fragments);
        }
        let x = render_value(value);
        let code = match (prop, cx.mode) {
            ("title", OutputMode::Declarative) => format!(".title({})", x),
            ("title", OutputMode::Imperative) => format!("target?.setTitle({})", x),
            _ => return None,
        };
        Some(vec![Fragment::new(prop, code)])
    }
}

struct ImageHandler;

impl Handler for ImageHandler {
    fn constructor(&self, _node: &ComponentNode) -> String {
        "Image()".to_string()
    }

    fn handle_specific(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        let x = render_value(value);
        let code = match (prop, cx.mode) {
            ("source" | "image", OutputMode::Declarative) => format!(".image({})", x),
            ("source" | "image", OutputMode::Imperative) => {
                format!("target?.image = Image(named: {})", x)
            }
            ("template", OutputMode::Declarative) => format!(".template({})", x),
            ("template", OutputMode::Imperative) => format!("target?.rendersTemplate = {}", x),
            _ => return None,
        };
        Some(vec![Fragment::new(prop, code)])
    }
}

struct SliderHandler;

impl Handler for SliderHandler {
    fn constructor(&self, node: &ComponentNode) -> String {
        match node.kind.to_lowercase().as_str() {
            "progress" | "progressbar" => "ProgressBar()".to_string(),
            _ => "Slider()".to_string(),
        }
    }

    fn handle_specific(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        let x = render_value(value);
        let code = match (prop, cx.mode) {
            ("value", OutputMode::Declarative) => format!(".value({})", x),
            ("value", OutputMode::Imperative) => format!("target?.value = {}", x),
            ("min", OutputMode::Declarative) => format!(".min({})", x),
            ("min", OutputMode::Imperative) => format!("target?.minimumValue = {}", x),
            ("max", OutputMode::Declarative) => format!(".max({})", x),
            ("max", OutputMode::Imperative) => format!("target?.maximumValue = {}", x),
            _ => return None,
        };
        Some(vec![Fragment::new(prop, code)])
    }
}

struct StackHandler;

impl Handler for StackHandler {
    fn constructor(&self, node: &ComponentNode) -> String {
        match node.kind.to_lowercase().as_str() {
            "hstack" | "row" => "HStack()".to_string(),
            "zstack" => "ZStack()".to_string(),
            "view" | "container" => "Container()".to_string(),
            _ => "VStack()".to_string(),
        }
    }

    fn handle_specific(
        &self,
        prop: &str,
        value: &PropertyValue,
        cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        let x = render_value(value);
        let code = match (prop, cx.mode) {
            ("spacing", OutputMode::Declarative) => format!(".spacing({})", x),
            ("spacing", OutputMode::Imperative) => format!("target?.spacing = {}", x),
            ("axis", OutputMode::Declarative) => format!(".axis({})", x),
            ("axis", OutputMode::Imperative) => format!("target?.axis = {}", x),
            ("alignment", OutputMode::Declarative) => format!(".alignment({})", x),
            ("alignment", OutputMode::Imperative) => format!("target?.alignment = {}", x),
            ("distribution", OutputMode::Declarative) => format!(".distribution({})", x),
            ("distribution", OutputMode::Imperative) => format!("target?.distribution = {}", x),
            _ => return None,
        };
        Some(vec![Fragment::new(prop, code)])
    }
}

/// Fallback for unregistered type keys: common properties still emit,
/// specific-only keys are dropped.
struct DefaultHandler;

impl Handler for DefaultHandler {
    fn handle_specific(
        &self,
        _prop: &str,
        _value: &PropertyValue,
        _cx: &HandlerCx,
    ) -> Option<Vec<Fragment>> {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(doc: serde_json::Value) -> ComponentNode {
        ComponentNode::from_json(&doc).unwrap()
    }

    fn emit(doc: serde_json::Value, mode: OutputMode) -> Vec<Fragment> {
        let n = node(doc);
        let handler = lookup(&n.kind).unwrap_or_else(default_handler);
        dispatch(handler, &n, mode)
    }

    #[test]
    fn test_lookup_is_case_insensitive_with_aliases() {
        assert!(lookup("Label").is_some());
        assert!(lookup("TEXTFIELD").is_some());
        assert!(lookup("Switch").is_some());
        assert!(lookup("Gizmo").is_none());
    }

    #[test]
    fn test_text_guard_only_wraps_initial_value_props() {
        let fragments = emit(
            json!({ "type": "Label", "text": "@{title}", "fontSize": "@{size}" }),
            OutputMode::Imperative,
        );
        assert_eq!(fragments.len(), 2);
        assert_eq!(
            fragments[0].code,
            "if target?.isInitialized != true { target?.text = model.title }"
        );
        // fontSize applies unconditionally, without a guard.
        assert!(fragments[1].code.starts_with("target?.font = Font(family:"));
        assert!(!fragments[1].code.contains("isInitialized"));
    }

    #[test]
    fn test_fragment_order_follows_property_order() {
        let fragments = emit(
            json!({ "type": "Label", "opacity": 0.5, "text": "hi", "background": "red" }),
            OutputMode::Declarative,
        );
        let props: Vec<&str> = fragments.iter().map(|f| f.property.as_str()).collect();
        assert_eq!(props, vec!["opacity", "text", "background"]);
    }

    #[test]
    fn test_unknown_type_gets_common_drops_specific() {
        let n = node(json!({
            "type": "Gizmo",
            "background": "@{bg}",
            "opacity": "@{fade}",
            "whirl": 3
        }));
        assert!(lookup(&n.kind).is_none());
        let fragments = dispatch(default_handler(), &n, OutputMode::Declarative);
        let props: Vec<&str> = fragments.iter().map(|f| f.property.as_str()).collect();
        assert_eq!(props, vec!["background", "opacity"]);
        assert_eq!(fragments[0].code, ".background(model.bg)");
    }

    #[test]
    fn test_toggle_checked_has_no_guard() {
        let fragments = emit(
            json!({ "type": "Switch", "checked": "@{on}" }),
            OutputMode::Imperative,
        );
        assert_eq!(fragments[0].code, "target?.isOn = model.on");
    }

    #[test]
    fn test_selector_prompt_shifts_index() {
        let fragments = emit(
            json!({ "type": "Picker", "prompt": "Choose", "selectedIndex": "@{sel}" }),
            OutputMode::Imperative,
        );
        let idx = fragments
            .iter()
            .find(|f| f.property == "selectedIndex")
            .unwrap();
        assert_eq!(idx.code, "target?.selectedIndex = (model.sel) + 1");
    }

    #[test]
    fn test_selector_prompt_excluded_does_not_shift() {
        let fragments = emit(
            json!({
                "type": "Picker",
                "prompt": "Choose",
                "promptExcluded": true,
                "selectedIndex": "@{sel}"
            }),
            OutputMode::Imperative,
        );
        let idx = fragments
            .iter()
            .find(|f| f.property == "selectedIndex")
            .unwrap();
        assert_eq!(idx.code, "target?.selectedIndex = model.sel");
    }

    #[test]
    fn test_selector_without_prompt_does_not_shift() {
        let fragments = emit(
            json!({ "type": "Dropdown", "selectedIndex": 2 }),
            OutputMode::Declarative,
        );
        assert_eq!(fragments[0].code, ".selectedIndex(2)");
    }

    #[test]
    fn test_font_family_preserves_declared_size() {
        let fragments = emit(
            json!({ "type": "Label", "fontFamily": "Mono", "fontSize": 18 }),
            OutputMode::Declarative,
        );
        assert_eq!(fragments[0].code, ".font(Font(family: \"Mono\", size: 18))");
        assert_eq!(fragments[1].code, ".font(Font(family: \"Mono\", size: 18))");
    }

    #[test]
    fn test_font_family_defaults_to_14() {
        let fragments = emit(
            json!({ "type": "Label", "fontFamily": "Mono" }),
            OutputMode::Imperative,
        );
        assert_eq!(
            fragments[0].code,
            "target?.font = Font(family: \"Mono\", size: target?.font?.pointSize ?? 14)"
        );
    }

    #[test]
    fn test_body_context_defaults_to_17() {
        let fragments = emit(
            json!({ "type": "Label", "context": "body", "fontFamily": "Mono" }),
            OutputMode::Imperative,
        );
        assert!(fragments[0].code.ends_with("pointSize ?? 17)"));
    }

    #[test]
    fn test_font_size_preserves_live_family() {
        let fragments = emit(
            json!({ "type": "Label", "fontSize": "@{size}" }),
            OutputMode::Imperative,
        );
        assert_eq!(
            fragments[0].code,
            "target?.font = Font(family: target?.font?.family ?? Font.systemFamily, size: model.size)"
        );
    }

    #[test]
    fn test_binding_valued_relative_order_emits_convergence() {
        let fragments = emit(
            json!({ "type": "View", "id": "card", "above": "@{anchor}" }),
            OutputMode::Imperative,
        );
        assert_eq!(fragments[0].code, "target?.zPosition = (orderMap[model.anchor] ?? 0) + (1)");
        assert_eq!(
            fragments[1].code,
            "orderMap[\"card\"] = target?.zPosition ?? 0"
        );
        assert!(fragments[2].code.starts_with("orderMap.onChange {"));
    }

    #[test]
    fn test_on_change_republishes_resolved_value() {
        // Without the republish, a dynamic chain C above B above A stalls
        // after one hop: B recomputes its own position but dependents keep
        // reading B's initial map entry.
        let fragments = emit(
            json!({ "type": "View", "id": "b", "above": "@{anchor}" }),
            OutputMode::Imperative,
        );
        assert_eq!(
            fragments[2].code,
            "orderMap.onChange { target?.zPosition = (orderMap[model.anchor] ?? 0) + (1); orderMap[\"b\"] = target?.zPosition ?? 0 }"
        );
    }

    #[test]
    fn test_anonymous_node_on_change_has_no_republish() {
        let fragments = emit(
            json!({ "type": "View", "above": "@{anchor}" }),
            OutputMode::Imperative,
        );
        assert_eq!(fragments.len(), 2);
        assert_eq!(
            fragments[1].code,
            "orderMap.onChange { target?.zPosition = (orderMap[model.anchor] ?? 0) + (1) }"
        );
    }

    #[test]
    fn test_render_value_literals() {
        assert_eq!(render_value(&PropertyValue::from_json(&json!("red"))), "\"red\"");
        assert_eq!(render_value(&PropertyValue::from_json(&json!(2.5))), "2.5");
        assert_eq!(render_value(&PropertyValue::from_json(&json!(true))), "true");
        assert_eq!(render_value(&PropertyValue::from_json(&json!(null))), "nil");
        assert_eq!(
            render_value(&PropertyValue::from_json(&json!(["a", 1]))),
            "[\"a\", 1]"
        );
        assert_eq!(
            render_value(&PropertyValue::from_json(&json!({ "top": 4 }))),
            "[\"top\": 4]"
        );
    }

    #[test]
    fn test_control_characters_escaped_not_dropped() {
        let fragments = emit(
            json!({ "type": "Label", "text": "a\tb\r\nc" }),
            OutputMode::Declarative,
        );
        assert_eq!(fragments[0].code, ".text(\"a\\tb\\r\\nc\")");
    }

    #[test]
    fn test_partial_interpolation_stays_literal() {
        let fragments = emit(
            json!({ "type": "Label", "text": "pre @{x} post" }),
            OutputMode::Declarative,
        );
        assert_eq!(fragments[0].code, ".text(\"pre @{x} post\")");
    }
}
