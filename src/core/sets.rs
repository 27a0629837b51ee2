//! Named set rendering
//!
//! Sets are printed as the nft statements that would recreate them:
//!
//! ```text
//! add set inet filter blocklist { type ipv4_addr; size 65535; flags interval; }
//! flush set inet filter blocklist
//! add element inet filter blocklist { 10.0.0.0/8 }
//! add element inet filter blocklist { 192.0.2.1 comment "scanner" }
//! ```

use crate::core::ruleset::Set;
use indexmap::IndexMap;
use serde_json::Value;

/// Size nft assumes when a set declares none
pub const DEFAULT_SET_SIZE: u64 = 65535;

/// One renderable set element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetElement {
    pub value: String,
    pub comment: Option<String>,
}

/// Renders a bare element value in nft syntax.
///
/// Handles scalars, `prefix`, `range`, `concat` and wrapped `elem` objects.
/// Other objects fall back to compact JSON. Returns `None` for `null` and for
/// `prefix`/`range` objects missing their parts.
pub fn format_element(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            if let Some(prefix) = map.get("prefix") {
                let addr = prefix.get("addr").and_then(format_element)?;
                let len = prefix.get("len").and_then(format_element)?;
                Some(format!("{addr}/{len}"))
            } else if let Some(range) = map.get("range") {
                let bounds = range.as_array()?;
                let low = bounds.first().and_then(format_element)?;
                let high = bounds.get(1).and_then(format_element)?;
                Some(format!("{low}-{high}"))
            } else if let Some(parts) = map.get("concat").and_then(Value::as_array) {
                let parts: Vec<String> = parts.iter().filter_map(format_element).collect();
                Some(parts.join(" . "))
            } else if let Some(elem) = map.get("elem") {
                elem.get("val").and_then(format_element)
            } else {
                Some(value.to_string())
            }
        }
        other => Some(other.to_string()),
    }
}

/// Extracts value and comment of a set element.
///
/// Elements that render to nothing (empty strings, wrapped elements without
/// `val`, `null`) are skipped.
pub fn element_entry(elem: &Value) -> Option<SetElement> {
    let (value, comment) = match elem.get("elem") {
        Some(wrapped) => (
            wrapped.get("val").and_then(format_element),
            wrapped
                .get("comment")
                .and_then(Value::as_str)
                .map(str::to_string),
        ),
        None => (format_element(elem), None),
    };

    value
        .filter(|v| !v.is_empty())
        .map(|value| SetElement { value, comment })
}

/// Renders the `add set`, `flush set` and `add element` lines of one set.
pub fn render_set(set: &Set) -> Vec<String> {
    let target = format!("{} {} {}", set.family, set.table, set.name);
    let set_type = set
        .set_type
        .as_ref()
        .map_or_else(|| "unknown".to_string(), ToString::to_string);
    let size = set.size.unwrap_or(DEFAULT_SET_SIZE);

    let mut declaration = format!("type {set_type}; size {size};");
    if !set.flags.is_empty() {
        declaration.push_str(&format!(" flags {};", set.flags.as_slice().join(",")));
    }

    let mut lines = Vec::with_capacity(set.elem.len() + 2);
    lines.push(format!("add set {target} {{ {declaration} }}"));
    lines.push(format!("flush set {target}"));

    for entry in set.elem.iter().filter_map(element_entry) {
        match entry.comment {
            Some(comment) => lines.push(format!(
                "add element {target} {{ {} comment \"{comment}\" }}",
                entry.value
            )),
            None => lines.push(format!("add element {target} {{ {} }}", entry.value)),
        }
    }

    lines
}

/// Renders all sets matching `filter` (`None` or `"all"` selects every set).
pub fn render_sets(sets: &IndexMap<String, Set>, filter: Option<&str>) -> Vec<String> {
    sets.iter()
        .filter(|(name, _)| match filter {
            None | Some("all") => true,
            Some(wanted) => wanted == name.as_str(),
        })
        .flat_map(|(_, set)| render_set(set))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set_from(value: Value) -> Set {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_format_scalars_and_shapes() {
        assert_eq!(format_element(&json!("10.0.0.1")).as_deref(), Some("10.0.0.1"));
        assert_eq!(format_element(&json!(443)).as_deref(), Some("443"));
        assert_eq!(
            format_element(&json!({ "prefix": { "addr": "10.0.0.0", "len": 8 } })).as_deref(),
            Some("10.0.0.0/8")
        );
        assert_eq!(
            format_element(&json!({ "range": [0, 1024] })).as_deref(),
            Some("0-1024")
        );
        assert_eq!(
            format_element(&json!({ "concat": ["10.0.0.1", 22] })).as_deref(),
            Some("10.0.0.1 . 22")
        );
        assert_eq!(format_element(&json!(null)), None);
        assert_eq!(format_element(&json!({ "prefix": { "addr": "10.0.0.0" } })), None);
    }

    #[test]
    fn test_wrapped_element_with_comment() {
        let set = set_from(json!({
            "family": "inet", "table": "filter", "name": "hosts",
            "type": "ipv4_addr",
            "elem": [ { "elem": { "val": "10.0.0.1", "comment": "home" } } ]
        }));
        let lines = render_set(&set);
        assert_eq!(
            lines,
            vec![
                "add set inet filter hosts { type ipv4_addr; size 65535; }",
                "flush set inet filter hosts",
                "add element inet filter hosts { 10.0.0.1 comment \"home\" }",
            ]
        );
    }

    #[test]
    fn test_declaration_with_flags_and_size() {
        let set = set_from(json!({
            "family": "ip", "table": "t", "name": "nets",
            "type": "ipv4_addr", "size": 128, "flags": ["interval", "timeout"],
            "elem": [
                { "prefix": { "addr": "192.168.0.0", "len": 16 } },
                { "range": ["10.0.0.1", "10.0.0.9"] }
            ]
        }));
        let lines = render_set(&set);
        assert_eq!(
            lines[0],
            "add set ip t nets { type ipv4_addr; size 128; flags interval,timeout; }"
        );
        assert_eq!(lines[2], "add element ip t nets { 192.168.0.0/16 }");
        assert_eq!(lines[3], "add element ip t nets { 10.0.0.1-10.0.0.9 }");
    }

    #[test]
    fn test_declaration_with_lone_flag() {
        let set = set_from(json!({
            "family": "inet", "table": "filter", "name": "nets",
            "type": "ipv4_addr", "flags": "interval",
            "elem": [ { "prefix": { "addr": "10.0.0.0", "len": 8 } } ]
        }));
        assert_eq!(
            render_set(&set),
            vec![
                "add set inet filter nets { type ipv4_addr; size 65535; flags interval; }",
                "flush set inet filter nets",
                "add element inet filter nets { 10.0.0.0/8 }",
            ]
        );
    }

    #[test]
    fn test_unrenderable_elements_skipped() {
        let set = set_from(json!({
            "family": "ip", "table": "t", "name": "s",
            "elem": [ "", null, { "elem": { "comment": "no value" } }, 22 ]
        }));
        let lines = render_set(&set);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "add set ip t s { type unknown; size 65535; }");
        assert_eq!(lines[2], "add element ip t s { 22 }");
    }

    #[test]
    fn test_render_sets_filter() {
        let mut sets = IndexMap::new();
        for name in ["a", "b"] {
            sets.insert(
                name.to_string(),
                set_from(json!({ "family": "ip", "table": "t", "name": name })),
            );
        }
        assert_eq!(render_sets(&sets, None).len(), 4);
        assert_eq!(render_sets(&sets, Some("all")).len(), 4);
        let only_b = render_sets(&sets, Some("b"));
        assert_eq!(only_b.len(), 2);
        assert!(only_b[0].contains(" b {"));
        assert!(render_sets(&sets, Some("missing")).is_empty());
    }
}
