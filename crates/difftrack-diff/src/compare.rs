//! Value-level diff: compare two JSON trees and produce patch operations.
//!
//! Objects are compared key by key (removed keys first, then shared keys
//! recursively, then added keys). Arrays are compared element by element over
//! their common prefix; a longer new array appends its tail with ascending
//! `add`s and a shorter one drops the old tail with descending `remove`s, so
//! the list can be applied in order. Any other difference, including a change
//! of type, is a `replace` of the whole node. So is a change to an empty key
//! of the root object, which no path can address on its own.

use serde_json::Value;

use difftrack_path::{is_root, join};
use difftrack_types::{DiffChecker, PatchOp};

/// Compute the patch list turning `old` into `new`.
///
/// Returns an empty list when the two values are deeply equal.
pub fn diff(old: &Value, new: &Value) -> Vec<PatchOp> {
    let mut patches = Vec::new();
    diff_into(old, new, "", &mut patches);
    patches
}

/// Returns `true` if `old` and `new` differ once `checker` (if any) has
/// filtered the patch list.
pub fn is_changed(old: &Value, new: &Value, checker: Option<&DiffChecker>) -> bool {
    if old == new {
        return false;
    }
    let patches = diff(old, new);
    match checker {
        Some(checker) => patches.iter().any(|patch| checker.retains(patch)),
        None => !patches.is_empty(),
    }
}

fn diff_into(old: &Value, new: &Value, path: &str, out: &mut Vec<PatchOp>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            // A top-level "" key joins to "/", which addresses the root.
            if is_root(path) && old_map.get("") != new_map.get("") {
                out.push(PatchOp::replace(path, new.clone()));
                return;
            }

            // Removed and modified keys.
            for (key, old_val) in old_map {
                let child = join(path, key);
                match new_map.get(key) {
                    Some(new_val) => diff_into(old_val, new_val, &child, out),
                    None => out.push(PatchOp::remove(child)),
                }
            }

            // Added keys.
            for (key, new_val) in new_map {
                if !old_map.contains_key(key) {
                    out.push(PatchOp::add(join(path, key), new_val.clone()));
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            let common = old_items.len().min(new_items.len());
            for (index, (old_val, new_val)) in
                old_items.iter().zip(new_items.iter()).enumerate()
            {
                diff_into(old_val, new_val, &join(path, &index.to_string()), out);
            }

            for (index, new_val) in new_items.iter().enumerate().skip(common) {
                out.push(PatchOp::add(join(path, &index.to_string()), new_val.clone()));
            }

            for index in (common..old_items.len()).rev() {
                out.push(PatchOp::remove(join(path, &index.to_string())));
            }
        }
        _ => out.push(PatchOp::replace(path, new.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_patches;
    use difftrack_types::PatchOpKind;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn identical_values_no_diff() {
        let value = json!({"a": 1, "b": "hello", "c": [1, 2]});
        assert!(diff(&value, &value).is_empty());
    }

    #[test]
    fn empty_to_populated() {
        let patches = diff(&json!({}), &json!({"x": 42, "y": "new"}));
        assert_eq!(
            patches,
            vec![PatchOp::add("/x", json!(42)), PatchOp::add("/y", json!("new"))]
        );
    }

    #[test]
    fn populated_to_empty() {
        let patches = diff(&json!({"x": 42}), &json!({}));
        assert_eq!(patches, vec![PatchOp::remove("/x")]);
    }

    #[test]
    fn nested_value_modification() {
        let old = json!({"config": {"debug": false, "port": 8080}});
        let new = json!({"config": {"debug": true, "port": 8080}});
        assert_eq!(
            diff(&old, &new),
            vec![PatchOp::replace("/config/debug", json!(true))]
        );
    }

    #[test]
    fn empty_root_key_replaces_whole_tree() {
        let old = json!({"": 1, "k": true});
        let new = json!({"": 2, "k": true});
        let patches = diff(&old, &new);
        assert_eq!(patches, vec![PatchOp::replace("", new.clone())]);
        assert_eq!(apply_patches(&old, &patches), new);

        let removed = diff(&old, &json!({"k": true}));
        assert_eq!(apply_patches(&old, &removed), json!({"k": true}));
    }

    #[test]
    fn nested_empty_key_is_addressable() {
        let old = json!({"a": {"": 1}});
        let new = json!({"a": {"": 2}});
        let patches = diff(&old, &new);
        assert_eq!(patches, vec![PatchOp::replace("/a/", json!(2))]);
        assert_eq!(apply_patches(&old, &patches), new);
    }

    #[test]
    fn type_change_replaces_node() {
        let patches = diff(&json!({"value": 42}), &json!({"value": "forty-two"}));
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].op, PatchOpKind::Replace);
    }

    #[test]
    fn root_scalar_change_uses_empty_path() {
        let patches = diff(&json!(1), &json!(2));
        assert_eq!(patches, vec![PatchOp::replace("", json!(2))]);
    }

    #[test]
    fn array_growth_appends_in_order() {
        let patches = diff(&json!([1]), &json!([1, 2, 3]));
        assert_eq!(
            patches,
            vec![PatchOp::add("/1", json!(2)), PatchOp::add("/2", json!(3))]
        );
    }

    #[test]
    fn array_shrink_removes_from_the_end() {
        let patches = diff(&json!(["a", "b", "c"]), &json!(["a"]));
        assert_eq!(patches, vec![PatchOp::remove("/2"), PatchOp::remove("/1")]);
    }

    #[test]
    fn checker_filters_change_detection() {
        let old = json!({"pos": {"x": 0}, "data": {"title": "A"}});
        let new = json!({"pos": {"x": 99}, "data": {"title": "A"}});
        assert!(is_changed(&old, &new, None));
        assert!(!is_changed(&old, &new, Some(&DiffChecker::ignore(["/pos"]))));
        assert!(!is_changed(&old, &new, Some(&DiffChecker::listen(["data"]))));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,3}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                prop::collection::btree_map("[a-d0-1]{0,2}", inner, 0..5)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn apply_diff_round_trips(a in arb_value(), b in arb_value()) {
            let patches = diff(&a, &b);
            prop_assert_eq!(apply_patches(&a, &patches), b);
        }

        #[test]
        fn self_diff_is_empty(a in arb_value()) {
            prop_assert!(diff(&a, &a).is_empty());
        }
    }
}
