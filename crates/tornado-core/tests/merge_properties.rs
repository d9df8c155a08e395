//! Property tests for the structural merge.

use proptest::prelude::*;
use serde_json::{Map, Value, json};

use tornado_core::{ARRAY_UNION_KEYS, merge};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(Value::String),
    ]
}

fn element() -> impl Strategy<Value = Value> {
    prop_oneof![
        scalar(),
        prop::collection::btree_map("[a-c]", scalar(), 0..3)
            .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
    ]
}

fn union_array() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(element(), 0..6)
}

proptest! {
    #[test]
    fn union_keeps_target_and_adds_every_distinct_source_element(
        key in prop::sample::select(ARRAY_UNION_KEYS.to_vec()),
        source_items in union_array(),
        target_items in union_array(),
    ) {
        let source = json!({ key: source_items.clone() });
        let mut target = json!({ key: target_items.clone() });
        merge(&source, &mut target);

        let merged = target[key].as_array().unwrap();
        // Existing elements keep their position.
        prop_assert_eq!(&merged[..target_items.len()], &target_items[..]);
        // Every source element is present afterwards.
        for item in &source_items {
            prop_assert!(merged.contains(item));
        }
        // Nothing appended was already present.
        let appended = &merged[target_items.len()..];
        for (i, item) in appended.iter().enumerate() {
            prop_assert!(!target_items.contains(item));
            prop_assert!(!appended[..i].contains(item));
        }
    }

    #[test]
    fn scalar_conflicts_always_take_source(
        key in "[a-z]{1,8}",
        source_value in scalar(),
        target_value in scalar(),
    ) {
        prop_assume!(!ARRAY_UNION_KEYS.contains(&key.as_str()) && key != "untouched");
        let source = json!({ key.clone(): source_value.clone() });
        let mut target = json!({ key.clone(): target_value, "untouched": 1 });
        merge(&source, &mut target);

        prop_assert_eq!(&target[key.as_str()], &source_value);
        prop_assert_eq!(&target["untouched"], &json!(1));
    }

    #[test]
    fn merging_into_empty_copies_source(
        entries in prop::collection::btree_map("[a-z]{1,6}", element(), 0..6),
    ) {
        let source = Value::Object(entries.into_iter().collect());
        let mut target = json!({});
        merge(&source, &mut target);
        prop_assert_eq!(target, source);
    }
}
