//! Collection annotators.
//!
//! All three functions return a new collection and never touch their inputs.
//! Items present in both collections without a (filtered) difference are
//! passed through exactly as they appear in the new collection.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use difftrack_diff::is_changed;
use difftrack_types::{DiffChecker, DiffMarker};

use crate::identity::Identity;
use crate::markers::mark;

/// Annotate an array of objects keyed by `identity`.
///
/// For each item of `new`: an id missing from `old` is marked
/// [`DiffMarker::Added`]; an id present in both whose structural diff still
/// has patches after `checker` is marked [`DiffMarker::Changed`]; anything
/// else is passed through. Items of `old` whose id no longer appears in `new`
/// are then appended, marked [`DiffMarker::Removed`], in `old` order.
///
/// Markers are written as a `diff` field below `marker_path` (`""` for the
/// item root). Items without an id are passed through unmarked and never
/// reported as removed.
///
/// Arrays of scalars cannot carry markers. Passing one is a caller error: a
/// warning is logged and `new` is returned as is.
pub fn annotate_object_array(
    old: &[Value],
    new: &[Value],
    identity: impl Into<Identity>,
    marker_path: &str,
    checker: Option<&DiffChecker>,
) -> Vec<Value> {
    if is_primitive_collection(old.iter().chain(new.iter())) {
        warn!(
            old_len = old.len(),
            new_len = new.len(),
            "object-array annotator called on an array of primitives; returning new array unchanged"
        );
        return new.to_vec();
    }

    let identity = identity.into();
    let old_by_id: HashMap<String, &Value> = old
        .iter()
        .filter_map(|item| identity.key_of(item).map(|key| (key, item)))
        .collect();
    let new_ids: HashSet<String> = new.iter().filter_map(|item| identity.key_of(item)).collect();

    let mut out = Vec::with_capacity(new.len());
    for item in new {
        let Some(key) = identity.key_of(item) else {
            debug!("item without identity passed through unmarked");
            out.push(item.clone());
            continue;
        };
        out.push(annotate_item(old_by_id.get(&key).copied(), item, marker_path, checker));
    }

    for item in old {
        if let Some(key) = identity.key_of(item) {
            if !new_ids.contains(&key) {
                out.push(mark(item, marker_path, DiffMarker::Removed));
            }
        }
    }

    out
}

/// Annotate a map keyed by object key.
///
/// Same semantics as [`annotate_object_array`] with the key playing the role
/// of the id: entries of `new` come first (added, changed or untouched), then
/// entries only present in `old`, marked removed.
///
/// A map whose values are scalars is a caller error handled like the scalar
/// array case.
pub fn annotate_map(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    marker_path: &str,
    checker: Option<&DiffChecker>,
) -> Map<String, Value> {
    if is_primitive_collection(old.values().chain(new.values())) {
        warn!(
            old_len = old.len(),
            new_len = new.len(),
            "map annotator called on a map of primitives; returning new map unchanged"
        );
        return new.clone();
    }

    let mut out = Map::new();
    for (key, item) in new {
        out.insert(
            key.clone(),
            annotate_item(old.get(key), item, marker_path, checker),
        );
    }

    for (key, item) in old {
        if !new.contains_key(key) {
            out.insert(key.clone(), mark(item, marker_path, DiffMarker::Removed));
        }
    }

    out
}

/// Annotate an array of scalars.
///
/// Scalars have nowhere to carry a marker, so this returns a copy of `new`.
/// Accept/reject of scalar arrays is reconciled by occurrence counting in the
/// state store instead.
pub fn annotate_primitive_array(_old: &[Value], new: &[Value]) -> Vec<Value> {
    new.to_vec()
}

fn annotate_item(
    old: Option<&Value>,
    item: &Value,
    marker_path: &str,
    checker: Option<&DiffChecker>,
) -> Value {
    match old {
        None => mark(item, marker_path, DiffMarker::Added),
        Some(old_item) if is_changed(old_item, item, checker) => {
            mark(item, marker_path, DiffMarker::Changed)
        }
        Some(_) => item.clone(),
    }
}

/// A collection is primitive when its first element is not an object.
fn is_primitive_collection<'a>(mut items: impl Iterator<Item = &'a Value>) -> bool {
    items.next().is_some_and(|first| !first.is_object())
}
