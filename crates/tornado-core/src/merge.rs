//! Recursive structural merge of configuration trees.
//!
//! `merge(source, target)` overlays `source` onto `target` in place:
//!
//! - keys listed in [`ARRAY_UNION_KEYS`] holding arrays on both sides are
//!   unioned: each source element is appended unless an element equal to
//!   it (deep structural equality) is already present;
//! - objects on both sides are merged recursively;
//! - any other conflict is won by `source`;
//! - keys missing from `target` are copied over.
//!
//! Keys present only in `target` are never touched.

use serde_json::{Map, Value};

/// Keys whose arrays are merged as sets instead of being replaced.
pub const ARRAY_UNION_KEYS: &[&str] = &["protocols", "endpoints", "custom_domains"];

/// Merge `source` into `target` and return `target`.
///
/// At the top level a non-object `source` replaces a non-object `target`
/// and leaves an object `target` alone.
pub fn merge<'a>(source: &Value, target: &'a mut Value) -> &'a mut Value {
    if let (Value::Object(src), Value::Object(dst)) = (source, &mut *target) {
        merge_maps(src, dst);
    } else if !target.is_object() {
        *target = source.clone();
    }
    target
}

/// Merge the entries of `source` into `target`.
pub fn merge_maps(source: &Map<String, Value>, target: &mut Map<String, Value>) {
    for (key, incoming) in source {
        let Some(existing) = target.get_mut(key) else {
            target.insert(key.clone(), incoming.clone());
            continue;
        };

        if is_array_union_key(key) {
            if let (Value::Array(items), Value::Array(current)) = (incoming, &mut *existing) {
                union_into(items, current);
                continue;
            }
        }

        match (incoming, existing) {
            (Value::Object(src), Value::Object(dst)) => merge_maps(src, dst),
            (_, slot) => *slot = incoming.clone(),
        }
    }
}

fn is_array_union_key(key: &str) -> bool {
    ARRAY_UNION_KEYS.contains(&key)
}

fn union_into(items: &[Value], current: &mut Vec<Value>) {
    for item in items {
        if !current.contains(item) {
            current.push(item.clone());
        }
    }
}

/// Human-readable name of a value's variant, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_conflicts_take_source() {
        let mut target = json!({"environment": "release", "ttl": 600});
        merge(&json!({"environment": "test", "ttl": 60}), &mut target);
        assert_eq!(target, json!({"environment": "test", "ttl": 60}));
    }

    #[test]
    fn missing_keys_are_copied_and_others_kept() {
        let mut target = json!({"handler": "index.main_handler"});
        merge(&json!({"timeout": 10, "vpc": {"subnet": "s-1"}}), &mut target);
        assert_eq!(
            target,
            json!({"handler": "index.main_handler", "timeout": 10, "vpc": {"subnet": "s-1"}})
        );
    }

    #[test]
    fn nested_objects_merge_recursively() {
        let mut target = json!({"environment": {"variables": {"A": "1", "B": "2"}}});
        merge(&json!({"environment": {"variables": {"B": "3", "C": "4"}}}), &mut target);
        assert_eq!(
            target,
            json!({"environment": {"variables": {"A": "1", "B": "3", "C": "4"}}})
        );
    }

    #[test]
    fn union_keys_append_missing_elements() {
        let mut target = json!({"protocols": ["http"]});
        merge(&json!({"protocols": ["https", "http"]}), &mut target);
        assert_eq!(target, json!({"protocols": ["http", "https"]}));
    }

    #[test]
    fn union_uses_exact_element_equality() {
        // The serialized form of {"domain":"a.com"} is a substring of the
        // larger element's serialized form, but they are different elements.
        let mut target = json!({
            "custom_domains": [{"domain": "a.com", "certificate_id": "c"}]
        });
        merge(&json!({"custom_domains": [{"domain": "a.com"}]}), &mut target);
        assert_eq!(
            target["custom_domains"],
            json!([{"domain": "a.com", "certificate_id": "c"}, {"domain": "a.com"}])
        );
    }

    #[test]
    fn union_skips_structurally_equal_objects() {
        let mut target = json!({"endpoints": [{"path": "/", "method": "ANY"}]});
        merge(&json!({"endpoints": [{"method": "ANY", "path": "/"}]}), &mut target);
        assert_eq!(target["endpoints"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn non_union_arrays_are_replaced() {
        let mut target = json!({"include": ["a", "b"]});
        merge(&json!({"include": ["c"]}), &mut target);
        assert_eq!(target, json!({"include": ["c"]}));
    }

    #[test]
    fn union_key_with_mismatched_shapes_is_overwritten() {
        let mut target = json!({"protocols": "http"});
        merge(&json!({"protocols": ["https"]}), &mut target);
        assert_eq!(target, json!({"protocols": ["https"]}));
    }

    #[test]
    fn top_level_scalar_source_does_not_clobber_object() {
        let mut target = json!({"a": 1});
        merge(&json!("x"), &mut target);
        assert_eq!(target, json!({"a": 1}));

        let mut scalar = json!(1);
        merge(&json!("x"), &mut scalar);
        assert_eq!(scalar, json!("x"));
    }

    #[test]
    fn merge_is_deterministic() {
        let source = json!({"protocols": ["https"], "environment": "test"});
        let base = json!({"protocols": ["http"], "environment": "release", "x": {"y": 1}});

        let mut first = base.clone();
        let mut second = base.clone();
        merge(&source, &mut first);
        merge(&source, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn value_kind_names() {
        assert_eq!(value_kind(&json!([])), "an array");
        assert_eq!(value_kind(&json!({})), "a table");
        assert_eq!(value_kind(&json!(null)), "null");
    }
}
