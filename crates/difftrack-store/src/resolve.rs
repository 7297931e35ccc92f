//! Path-scoped accept and reject.
//!
//! A selection resolves to one of three shapes:
//!
//! - **Object arrays** (the first element is an object) are reconciled by
//!   item identity: added, removed and changed ids are accepted into the
//!   baseline or rejected out of the proposal one at a time or all at once.
//! - **Scalar arrays** are reconciled by occurrence counting of a single
//!   target value, so duplicates that were already in the baseline survive a
//!   reject.
//! - **Anything else** is treated as one field and accepted or rejected
//!   atomically.
//!
//! The functions here only compute the next old/new trees; recording
//! history and recomputing the projection happens in
//! [`DiffHistoryState`](crate::DiffHistoryState).

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use difftrack_annotate::{identity_key, strip_markers, Identity};
use difftrack_diff::is_changed;
use difftrack_types::DiffChecker;

use crate::selection::DiffSelection;
use crate::state::DiffState;

/// The next old/new trees produced by a resolution.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Resolved {
    pub old_state: Value,
    pub new_state: Value,
    /// Set when a single object-array item was resolved.
    pub single_item: bool,
}

/// How an identified item differs between old and new.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Change {
    Added,
    Changed,
    Removed,
}

/// Compute the trees resulting from accepting (or rejecting) `selection`.
///
/// Returns `None` when there is nothing to do: no matching change, a scalar
/// array without a target, or identical values at the path.
pub(crate) fn resolve(
    state: &DiffState,
    selection: &DiffSelection,
    marker_paths: &[String],
    checker: Option<&DiffChecker>,
    accept: bool,
) -> Option<Resolved> {
    let path = selection.path.as_str();
    let old_at = difftrack_path::get(&state.old_state, path);
    let new_at = difftrack_path::get(&state.new_state, path);

    match (old_at, new_at) {
        (Some(Value::Array(old_items)), Some(Value::Array(new_items))) => {
            let first = new_items.first().or_else(|| old_items.first());
            if first.is_some_and(|item| !item.is_object()) {
                resolve_scalars(state, path, old_items, new_items, selection, accept)
            } else {
                resolve_objects(
                    state,
                    path,
                    old_items,
                    new_items,
                    selection,
                    marker_paths,
                    checker,
                    accept,
                )
            }
        }
        _ => resolve_field(state, path, old_at, new_at, marker_paths, accept),
    }
}

fn resolve_field(
    state: &DiffState,
    path: &str,
    old_at: Option<&Value>,
    new_at: Option<&Value>,
    marker_paths: &[String],
    accept: bool,
) -> Option<Resolved> {
    if old_at == new_at {
        return None;
    }

    let (old_state, new_state) = if accept {
        match new_at {
            Some(value) => {
                let value = if value.is_object() {
                    strip_markers(value, marker_paths)
                } else {
                    value.clone()
                };
                (
                    difftrack_path::set(&state.old_state, path, value.clone()),
                    difftrack_path::set(&state.new_state, path, value),
                )
            }
            None => (
                difftrack_path::remove(&state.old_state, path).0,
                state.new_state.clone(),
            ),
        }
    } else {
        let new_state = match old_at {
            Some(value) => difftrack_path::set(&state.new_state, path, value.clone()),
            None => difftrack_path::remove(&state.new_state, path).0,
        };
        (state.old_state.clone(), new_state)
    };

    Some(Resolved {
        old_state,
        new_state,
        single_item: false,
    })
}

/// Reconcile the occurrence count of one scalar.
///
/// Accepting brings the baseline's count of the target up (or down) to the
/// proposal's; rejecting brings the proposal's count back to the baseline's,
/// removing only the excess occurrences.
fn resolve_scalars(
    state: &DiffState,
    path: &str,
    old_items: &[Value],
    new_items: &[Value],
    selection: &DiffSelection,
    accept: bool,
) -> Option<Resolved> {
    let Some(target) = selection.target_id.as_ref() else {
        debug!(path, "scalar array resolution needs a target value");
        return None;
    };

    let old_count = occurrences(old_items, target);
    let new_count = occurrences(new_items, target);
    if old_count == new_count {
        return None;
    }

    let (old_state, new_state) = if accept {
        let mut baseline = old_items.to_vec();
        set_occurrences(&mut baseline, target, new_count);
        if same_multiset(&baseline, new_items) {
            baseline = new_items.to_vec();
        }
        (
            difftrack_path::set(&state.old_state, path, Value::Array(baseline)),
            state.new_state.clone(),
        )
    } else {
        let mut proposal = new_items.to_vec();
        set_occurrences(&mut proposal, target, old_count);
        if same_multiset(&proposal, old_items) {
            proposal = old_items.to_vec();
        }
        (
            state.old_state.clone(),
            difftrack_path::set(&state.new_state, path, Value::Array(proposal)),
        )
    };

    Some(Resolved {
        old_state,
        new_state,
        single_item: false,
    })
}

#[allow(clippy::too_many_arguments)]
fn resolve_objects(
    state: &DiffState,
    path: &str,
    old_items: &[Value],
    new_items: &[Value],
    selection: &DiffSelection,
    marker_paths: &[String],
    checker: Option<&DiffChecker>,
    accept: bool,
) -> Option<Resolved> {
    let identity = &selection.identity;
    let old_index = index_by_id(old_items, identity);
    let new_index = index_by_id(new_items, identity);
    let changes = detect_changes(
        old_items,
        new_items,
        identity,
        &old_index,
        &new_index,
        marker_paths,
        checker,
    );
    if changes.is_empty() {
        debug!(path, "no changed items at path");
        return None;
    }

    let Some(target) = selection.target_id.as_ref() else {
        return Some(resolve_all_objects(
            state,
            path,
            old_items,
            new_items,
            identity,
            &changes,
            marker_paths,
            accept,
        ));
    };

    let key = identity_key(target);
    let Some(change) = changes.get(&key).copied() else {
        debug!(path, id = %key, "target has no detected change");
        return None;
    };

    let mut baseline = old_items.to_vec();
    let mut proposal = new_items.to_vec();
    match (accept, change) {
        (true, Change::Added | Change::Changed) => {
            let index = new_index[&key];
            let accepted = strip_markers(&new_items[index], marker_paths);
            proposal[index] = accepted.clone();
            baseline = rebuild_baseline(old_items, &proposal, identity, &old_index, &key, accepted);
        }
        (true, Change::Removed) => {
            baseline.remove(old_index[&key]);
        }
        (false, Change::Added) => {
            proposal.remove(new_index[&key]);
        }
        (false, Change::Changed) => {
            proposal[new_index[&key]] = old_items[old_index[&key]].clone();
        }
        (false, Change::Removed) => {
            let index = old_index[&key];
            let at = index.min(proposal.len());
            proposal.insert(at, old_items[index].clone());
        }
    }

    Some(Resolved {
        old_state: difftrack_path::set(&state.old_state, path, Value::Array(baseline)),
        new_state: difftrack_path::set(&state.new_state, path, Value::Array(proposal)),
        single_item: true,
    })
}

/// Accept or reject every changed item at once.
///
/// Accepting strips markers from the changed items and makes the result the
/// baseline at `path` as well; rejecting restores the old array, which drops
/// every pure addition.
#[allow(clippy::too_many_arguments)]
fn resolve_all_objects(
    state: &DiffState,
    path: &str,
    old_items: &[Value],
    new_items: &[Value],
    identity: &Identity,
    changes: &HashMap<String, Change>,
    marker_paths: &[String],
    accept: bool,
) -> Resolved {
    if !accept {
        return Resolved {
            old_state: state.old_state.clone(),
            new_state: difftrack_path::set(
                &state.new_state,
                path,
                Value::Array(old_items.to_vec()),
            ),
            single_item: false,
        };
    }

    let accepted: Vec<Value> = new_items
        .iter()
        .map(|item| match identity.key_of(item) {
            Some(key) if changes.contains_key(&key) => strip_markers(item, marker_paths),
            _ => item.clone(),
        })
        .collect();

    Resolved {
        old_state: difftrack_path::set(&state.old_state, path, Value::Array(accepted.clone())),
        new_state: difftrack_path::set(&state.new_state, path, Value::Array(accepted)),
        single_item: false,
    }
}

/// Position of every identified item, first occurrence wins.
fn index_by_id(items: &[Value], identity: &Identity) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (position, item) in items.iter().enumerate() {
        if let Some(key) = identity.key_of(item) {
            index.entry(key).or_insert(position);
        }
    }
    index
}

fn detect_changes(
    old_items: &[Value],
    new_items: &[Value],
    identity: &Identity,
    old_index: &HashMap<String, usize>,
    new_index: &HashMap<String, usize>,
    marker_paths: &[String],
    checker: Option<&DiffChecker>,
) -> HashMap<String, Change> {
    let mut changes = HashMap::new();

    for (key, &position) in new_index {
        match old_index.get(key) {
            None => {
                changes.insert(key.clone(), Change::Added);
            }
            Some(&old_position) => {
                let proposed = strip_markers(&new_items[position], marker_paths);
                if is_changed(&old_items[old_position], &proposed, checker) {
                    changes.insert(key.clone(), Change::Changed);
                }
            }
        }
    }

    for item in old_items {
        if let Some(key) = identity.key_of(item) {
            if !new_index.contains_key(&key) {
                changes.insert(key, Change::Removed);
            }
        }
    }

    changes
}

/// Rebuild the baseline array in proposal order with one item accepted.
///
/// Items the baseline already knows keep their baseline version, pending
/// additions are left out, and pending removals (plus items without an id)
/// follow at the end in baseline order.
fn rebuild_baseline(
    old_items: &[Value],
    proposal: &[Value],
    identity: &Identity,
    old_index: &HashMap<String, usize>,
    accepted_key: &str,
    accepted: Value,
) -> Vec<Value> {
    let mut baseline = Vec::with_capacity(old_items.len() + 1);
    let mut placed = Vec::new();

    for item in proposal {
        let Some(key) = identity.key_of(item) else {
            continue;
        };
        if key == accepted_key {
            baseline.push(accepted.clone());
            placed.push(key);
        } else if let Some(&position) = old_index.get(&key) {
            baseline.push(old_items[position].clone());
            placed.push(key);
        }
    }

    for item in old_items {
        let already_placed = identity
            .key_of(item)
            .is_some_and(|key| placed.contains(&key));
        if !already_placed {
            baseline.push(item.clone());
        }
    }

    baseline
}

fn occurrences(items: &[Value], target: &Value) -> usize {
    items.iter().filter(|item| *item == target).count()
}

/// Append or drop trailing occurrences of `target` until exactly `count` remain.
fn set_occurrences(items: &mut Vec<Value>, target: &Value, count: usize) {
    let have = occurrences(items, target);
    if have < count {
        items.extend(std::iter::repeat(target.clone()).take(count - have));
        return;
    }

    let mut excess = have - count;
    let mut position = items.len();
    while excess > 0 && position > 0 {
        position -= 1;
        if &items[position] == target {
            items.remove(position);
            excess -= 1;
        }
    }
}

fn same_multiset(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().all(|item| occurrences(a, item) == occurrences(b, item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn markers() -> Vec<String> {
        vec!["/data/diff".into(), "/diff".into(), "/meta/diff".into()]
    }

    fn diffing(old: Value, new: Value) -> DiffState {
        DiffState {
            patches: difftrack_diff::diff(&old, &new),
            old_state: old,
            computed_state: new.clone(),
            new_state: new,
            is_diff_mode: true,
        }
    }

    #[test]
    fn scalar_reject_removes_only_the_excess() {
        let state = diffing(json!({"list": ["x", "x"]}), json!({"list": ["x", "x", "x"]}));
        let selection = DiffSelection::at("/list").identity("value").target("x");

        let resolved = resolve(&state, &selection, &markers(), None, false).unwrap();
        assert_eq!(resolved.new_state, json!({"list": ["x", "x"]}));
        assert_eq!(resolved.old_state, json!({"list": ["x", "x"]}));
    }

    #[test]
    fn scalar_reject_keeps_other_values() {
        let state = diffing(json!({"tags": ["a", "b"]}), json!({"tags": ["a", "c", "b", "c"]}));
        let selection = DiffSelection::at("/tags").target("c");

        let resolved = resolve(&state, &selection, &markers(), None, false).unwrap();
        assert_eq!(resolved.new_state, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn scalar_accept_appends_to_baseline() {
        let state = diffing(json!({"tags": ["a"]}), json!({"tags": ["a", "b", "c"]}));
        let selection = DiffSelection::at("/tags").target("b");

        let resolved = resolve(&state, &selection, &markers(), None, true).unwrap();
        assert_eq!(resolved.old_state, json!({"tags": ["a", "b"]}));
        assert_eq!(resolved.new_state, state.new_state);
    }

    #[test]
    fn scalar_accept_converges_on_proposal_order() {
        let state = diffing(json!(["a"]), json!(["b", "a"]));
        let selection = DiffSelection::at("").target("b");

        let resolved = resolve(&state, &selection, &markers(), None, true).unwrap();
        assert_eq!(resolved.old_state, json!(["b", "a"]));
    }

    #[test]
    fn scalar_without_target_or_change_is_noop() {
        let state = diffing(json!({"l": [1, 2]}), json!({"l": [1, 2, 3]}));
        assert!(resolve(&state, &DiffSelection::at("/l"), &markers(), None, true).is_none());
        let unchanged = DiffSelection::at("/l").target(1);
        assert!(resolve(&state, &unchanged, &markers(), None, false).is_none());
    }

    #[test]
    fn accept_single_added_item() {
        let state = diffing(
            json!({"items": [{"id": "1", "v": 1}]}),
            json!({"items": [{"id": "2", "v": 2, "diff": "added"}, {"id": "1", "v": 1}, {"id": "3", "v": 3}]}),
        );
        let selection = DiffSelection::at("/items").target("2");

        let resolved = resolve(&state, &selection, &markers(), None, true).unwrap();
        assert!(resolved.single_item);
        assert_eq!(
            resolved.old_state,
            json!({"items": [{"id": "2", "v": 2}, {"id": "1", "v": 1}]})
        );
        assert_eq!(resolved.new_state["items"][0], json!({"id": "2", "v": 2}));
        assert_eq!(resolved.new_state["items"][2], json!({"id": "3", "v": 3}));
    }

    #[test]
    fn accept_single_removed_item() {
        let state = diffing(
            json!([{"id": 1}, {"id": 2}]),
            json!([{"id": 2}]),
        );
        let resolved = resolve(&state, &DiffSelection::at("/").target(1), &markers(), None, true)
            .unwrap();
        assert_eq!(resolved.old_state, json!([{"id": 2}]));
        assert_eq!(resolved.new_state, json!([{"id": 2}]));
    }

    #[test]
    fn reject_single_items() {
        let state = diffing(
            json!({"l": [{"id": 1, "v": "a"}, {"id": 2, "v": "b"}, {"id": 3, "v": "c"}]}),
            json!({"l": [{"id": 1, "v": "A"}, {"id": 3, "v": "c"}, {"id": 4, "v": "d"}]}),
        );

        let changed = resolve(&state, &DiffSelection::at("/l").target(1), &markers(), None, false)
            .unwrap();
        assert_eq!(changed.new_state["l"][0], json!({"id": 1, "v": "a"}));

        let added = resolve(&state, &DiffSelection::at("/l").target(4), &markers(), None, false)
            .unwrap();
        assert_eq!(
            added.new_state,
            json!({"l": [{"id": 1, "v": "A"}, {"id": 3, "v": "c"}]})
        );

        let removed = resolve(&state, &DiffSelection::at("/l").target(2), &markers(), None, false)
            .unwrap();
        assert_eq!(
            removed.new_state,
            json!({"l": [{"id": 1, "v": "A"}, {"id": 2, "v": "b"}, {"id": 3, "v": "c"}, {"id": 4, "v": "d"}]})
        );
        assert_eq!(removed.old_state, state.old_state);
    }

    #[test]
    fn unchanged_target_is_noop() {
        let state = diffing(
            json!([{"id": 1}, {"id": 2}]),
            json!([{"id": 1}, {"id": 2}, {"id": 3}]),
        );
        assert!(resolve(&state, &DiffSelection::at("").target(1), &markers(), None, true).is_none());
        assert!(resolve(&state, &DiffSelection::at("").target(9), &markers(), None, true).is_none());
    }

    #[test]
    fn checker_hides_ignored_changes() {
        let state = diffing(
            json!([{"id": 1, "pos": {"x": 0}}]),
            json!([{"id": 1, "pos": {"x": 5}}]),
        );
        let checker = DiffChecker::ignore(["/pos"]);
        let selection = DiffSelection::at("").target(1);
        assert!(resolve(&state, &selection, &markers(), Some(&checker), true).is_none());
        assert!(resolve(&state, &selection, &markers(), None, true).is_some());
    }

    #[test]
    fn accept_all_objects_syncs_baseline() {
        let state = diffing(
            json!({"l": [{"id": 1, "v": 1}]}),
            json!({"l": [{"id": 1, "v": 2, "meta": {"diff": "changed"}}, {"id": 2, "diff": "added"}]}),
        );
        let resolved = resolve(&state, &DiffSelection::at("/l"), &markers(), None, true).unwrap();
        let expected = json!({"l": [{"id": 1, "v": 2, "meta": {}}, {"id": 2}]});
        assert_eq!(resolved.old_state, expected);
        assert_eq!(resolved.new_state, expected);
        assert!(!resolved.single_item);
    }

    #[test]
    fn reject_all_objects_restores_old_array() {
        let state = diffing(
            json!({"l": [{"id": 1, "v": 1}, {"id": 2}]}),
            json!({"l": [{"id": 1, "v": 2}, {"id": 3}]}),
        );
        let resolved = resolve(&state, &DiffSelection::at("/l"), &markers(), None, false).unwrap();
        assert_eq!(resolved.new_state, state.old_state);
    }

    #[test]
    fn field_accept_and_reject() {
        let state = diffing(
            json!({"doc": {"title": "A"}, "n": 1}),
            json!({"doc": {"title": "B", "diff": "changed"}, "n": 2}),
        );

        let accepted = resolve(&state, &DiffSelection::at("/doc"), &markers(), None, true).unwrap();
        assert_eq!(accepted.old_state, json!({"doc": {"title": "B"}, "n": 1}));
        assert_eq!(accepted.new_state, json!({"doc": {"title": "B"}, "n": 2}));

        let rejected = resolve(&state, &DiffSelection::at("/n"), &markers(), None, false).unwrap();
        assert_eq!(rejected.new_state["n"], json!(1));
        assert_eq!(rejected.old_state, state.old_state);
    }

    #[test]
    fn field_added_or_removed_entirely() {
        let state = diffing(json!({"a": 1}), json!({"b": 2}));

        let reject_added = resolve(&state, &DiffSelection::at("/b"), &markers(), None, false).unwrap();
        assert_eq!(reject_added.new_state, json!({}));

        let accept_removed = resolve(&state, &DiffSelection::at("/a"), &markers(), None, true).unwrap();
        assert_eq!(accept_removed.old_state, json!({}));
        assert_eq!(accept_removed.new_state, json!({"b": 2}));
    }

    #[test]
    fn equal_field_is_noop() {
        let state = diffing(json!({"a": 1, "b": 1}), json!({"a": 1, "b": 2}));
        assert!(resolve(&state, &DiffSelection::at("/a"), &markers(), None, true).is_none());
    }

    #[test]
    fn set_occurrences_trims_from_the_end() {
        let mut items = vec![json!("x"), json!("y"), json!("x"), json!("x")];
        set_occurrences(&mut items, &json!("x"), 1);
        assert_eq!(items, vec![json!("x"), json!("y")]);
        set_occurrences(&mut items, &json!("z"), 2);
        assert_eq!(items, vec![json!("x"), json!("y"), json!("z"), json!("z")]);
    }
}
