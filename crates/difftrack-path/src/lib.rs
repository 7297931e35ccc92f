//! Path addressing for nested JSON values.
//!
//! A path is a slash-delimited list of segments: `/items/0/name` walks into
//! the `items` key of an object, then index `0` of an array, then the `name`
//! key. The empty path `""` and the bare `"/"` both address the root.
//!
//! Segments are taken literally (there is no `~0`/`~1` escaping), so object
//! keys containing `/` cannot be addressed.
//!
//! The pure operations [`get`] and [`set`] never mutate their input; the
//! `*_in_place` variants are the primitives they (and the patch engine) are
//! built from.

use serde_json::{Map, Value};

/// Split a path into its segments.
///
/// A single leading empty segment (from a leading `/`) is ignored; every
/// other segment, empty or not, is kept.
///
/// ```
/// use difftrack_path::segments;
///
/// assert!(segments("").is_empty());
/// assert!(segments("/").is_empty());
/// assert_eq!(segments("/a/0"), vec!["a", "0"]);
/// assert_eq!(segments("a/b"), vec!["a", "b"]);
/// ```
pub fn segments(path: &str) -> Vec<&str> {
    if is_root(path) {
        return Vec::new();
    }
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split('/').collect()
}

/// Returns `true` for the two spellings of the root path.
pub fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

/// Append a segment to a base path.
///
/// ```
/// use difftrack_path::join;
///
/// assert_eq!(join("", "a"), "/a");
/// assert_eq!(join("/", "a"), "/a");
/// assert_eq!(join("/data", "diff"), "/data/diff");
/// assert_eq!(join("/data/", "diff"), "/data/diff");
/// ```
pub fn join(base: &str, segment: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    format!("{base}/{segment}")
}

/// Resolve the value at `path`.
///
/// Returns `None` as soon as a segment cannot be followed: a missing key, an
/// out-of-range or non-numeric array index, or a scalar node met before the
/// path is exhausted.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path)
        .into_iter()
        .try_fold(value, |node, segment| child(node, segment))
}

/// Return a copy of `value` with `new_value` written at `path`.
///
/// The root path replaces the whole tree. Missing intermediate segments are
/// created as empty objects.
pub fn set(value: &Value, path: &str, new_value: Value) -> Value {
    if is_root(path) {
        return new_value;
    }
    let mut out = value.clone();
    set_in_place(&mut out, path, new_value);
    out
}

/// Return a copy of `value` with the node at `path` removed, together with
/// the removed node (if any).
pub fn remove(value: &Value, path: &str) -> (Value, Option<Value>) {
    let mut out = value.clone();
    let removed = remove_in_place(&mut out, path);
    (out, removed)
}

/// Write `new_value` at `path`, assigning over whatever is there.
///
/// Array indices past the end pad the array with `null`. A scalar node in the
/// way, or an array addressed by a non-numeric segment, is replaced by an
/// empty object.
pub fn set_in_place(root: &mut Value, path: &str, new_value: Value) {
    let segs = segments(path);
    let Some((last, parents)) = segs.split_last() else {
        *root = new_value;
        return;
    };
    let parent = ensure_parent(root, parents);
    match (parent, array_index(last)) {
        (Value::Array(items), Some(index)) => {
            if index < items.len() {
                items[index] = new_value;
            } else {
                items.resize(index, Value::Null);
                items.push(new_value);
            }
        }
        (node, _) => {
            object_mut(node).insert((*last).to_string(), new_value);
        }
    }
}

/// Insert `new_value` at `path` with array insertion semantics.
///
/// When the parent is an array the value is inserted before `index`
/// (shifting later elements), and the segment `-` appends. Otherwise this
/// behaves like [`set_in_place`].
pub fn insert_in_place(root: &mut Value, path: &str, new_value: Value) {
    let segs = segments(path);
    let Some((last, parents)) = segs.split_last() else {
        *root = new_value;
        return;
    };
    let parent = ensure_parent(root, parents);
    match parent {
        Value::Array(items) if *last == "-" => items.push(new_value),
        Value::Array(items) if array_index(last).is_some() => {
            let index = array_index(last).unwrap_or(items.len());
            if index <= items.len() {
                items.insert(index, new_value);
            } else {
                items.resize(index, Value::Null);
                items.push(new_value);
            }
        }
        node => {
            object_mut(node).insert((*last).to_string(), new_value);
        }
    }
}

/// Remove the node at `path`, returning it.
///
/// Removing the root leaves `null` behind. Nothing is created along the way:
/// a path that does not resolve is left untouched and yields `None`.
pub fn remove_in_place(root: &mut Value, path: &str) -> Option<Value> {
    let segs = segments(path);
    let Some((last, parents)) = segs.split_last() else {
        return Some(std::mem::take(root));
    };
    let parent = parents
        .iter()
        .try_fold(root, |node, segment| child_mut(node, segment))?;
    match parent {
        Value::Object(map) => map.shift_remove(*last),
        Value::Array(items) => {
            let index = array_index(last)?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

/// Walk to the parent named by `parents`, creating containers as needed.
fn ensure_parent<'a>(root: &'a mut Value, parents: &[&str]) -> &'a mut Value {
    parents
        .iter()
        .fold(root, |node, segment| child_or_insert(node, segment))
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => array_index(segment).and_then(|index| items.get(index)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => array_index(segment).and_then(|index| items.get_mut(index)),
        _ => None,
    }
}

fn child_or_insert<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    match (node, array_index(segment)) {
        (Value::Array(items), Some(index)) => {
            if index >= items.len() {
                items.resize(index, Value::Null);
                items.push(Value::Object(Map::new()));
            }
            &mut items[index]
        }
        (node, _) => object_mut(node)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new())),
    }
}

/// View `node` as an object, replacing it with an empty one if it is not.
fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

fn array_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn root_paths_address_whole_value() {
        let value = json!({"a": 1});
        assert_eq!(get(&value, ""), Some(&value));
        assert_eq!(get(&value, "/"), Some(&value));
        assert_eq!(set(&value, "/", json!(7)), json!(7));
        assert_eq!(set(&value, "", json!([1])), json!([1]));
    }

    #[test]
    fn get_walks_objects_and_arrays() {
        let value = json!({"items": [{"name": "A"}, {"name": "B"}]});
        assert_eq!(get(&value, "/items/1/name"), Some(&json!("B")));
        assert_eq!(get(&value, "items/0"), Some(&json!({"name": "A"})));
        assert_eq!(get(&value, "/items/2"), None);
        assert_eq!(get(&value, "/items/x"), None);
    }

    #[test]
    fn get_stops_at_scalars() {
        let value = json!({"a": null, "b": 3});
        assert_eq!(get(&value, "/a/x"), None);
        assert_eq!(get(&value, "/b/0"), None);
        assert_eq!(get(&value, "/missing/deeper"), None);
    }

    #[test]
    fn set_does_not_mutate_input() {
        let value = json!({"a": {"b": 1}});
        let updated = set(&value, "/a/b", json!(2));
        assert_eq!(value, json!({"a": {"b": 1}}));
        assert_eq!(updated, json!({"a": {"b": 2}}));
    }

    #[test]
    fn set_creates_missing_intermediates() {
        let updated = set(&json!({}), "/data/meta/diff", json!("added"));
        assert_eq!(updated, json!({"data": {"meta": {"diff": "added"}}}));
    }

    #[test]
    fn set_replaces_scalar_in_the_way() {
        let updated = set(&json!({"data": 5}), "/data/diff", json!("changed"));
        assert_eq!(updated, json!({"data": {"diff": "changed"}}));
    }

    #[test]
    fn set_pads_arrays() {
        let updated = set(&json!({"list": [1]}), "/list/3", json!(4));
        assert_eq!(updated, json!({"list": [1, null, null, 4]}));
        let replaced = set(&updated, "/list/0", json!("x"));
        assert_eq!(replaced, json!({"list": ["x", null, null, 4]}));
    }

    #[test]
    fn insert_shifts_array_elements() {
        let mut value = json!([1, 3]);
        insert_in_place(&mut value, "/1", json!(2));
        assert_eq!(value, json!([1, 2, 3]));
        insert_in_place(&mut value, "/-", json!(4));
        assert_eq!(value, json!([1, 2, 3, 4]));
    }

    #[test]
    fn remove_from_object_and_array() {
        let value = json!({"a": [1, 2, 3], "b": true});
        let (without_b, removed) = remove(&value, "/b");
        assert_eq!(removed, Some(json!(true)));
        assert_eq!(without_b, json!({"a": [1, 2, 3]}));

        let (shorter, removed) = remove(&value, "/a/1");
        assert_eq!(removed, Some(json!(2)));
        assert_eq!(shorter, json!({"a": [1, 3], "b": true}));
    }

    #[test]
    fn remove_missing_path_is_noop() {
        let value = json!({"a": 1});
        let (same, removed) = remove(&value, "/x/y");
        assert_eq!(removed, None);
        assert_eq!(same, value);
    }

    #[test]
    fn remove_root_leaves_null() {
        let mut value = json!({"a": 1});
        assert_eq!(remove_in_place(&mut value, ""), Some(json!({"a": 1})));
        assert_eq!(value, Value::Null);
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,4}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-c0-2]{1,2}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-c0-3]{1,2}", 0..4).prop_map(|segs| {
            segs.iter().map(|s| format!("/{s}")).collect::<String>()
        })
    }

    proptest! {
        #[test]
        fn set_then_get_round_trips(v in arb_value(), p in arb_path(), x in arb_value()) {
            let updated = set(&v, &p, x.clone());
            prop_assert_eq!(get(&updated, &p), Some(&x));
        }
    }
}
