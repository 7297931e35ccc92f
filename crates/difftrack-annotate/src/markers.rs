//! Reading, writing and stripping diff markers.
//!
//! A marker lives in a `diff` field below a configurable marker path of an
//! item (`/diff` at the root, `/data/diff` below `data`, ...). Only values
//! that parse as a [`DiffMarker`] count; a `diff` field holding anything else
//! is ordinary data and is left alone.

use serde_json::Value;

use difftrack_path::join;
use difftrack_types::{DiffMarker, MARKER_FIELD};

/// Return a copy of `item` with `marker` written below `marker_path`.
pub fn mark(item: &Value, marker_path: &str, marker: DiffMarker) -> Value {
    difftrack_path::set(item, &join(marker_path, MARKER_FIELD), marker.into())
}

/// The first marker found at any of `marker_paths`.
pub fn marker_of<S: AsRef<str>>(item: &Value, marker_paths: &[S]) -> Option<DiffMarker> {
    marker_paths
        .iter()
        .filter_map(|path| difftrack_path::get(item, path.as_ref()))
        .find_map(DiffMarker::from_value)
}

/// Return a copy of `item` with the markers at `marker_paths` removed.
pub fn strip_markers<S: AsRef<str>>(item: &Value, marker_paths: &[S]) -> Value {
    let mut out = item.clone();
    for path in marker_paths {
        let path = path.as_ref();
        let is_marker = difftrack_path::get(&out, path)
            .and_then(DiffMarker::from_value)
            .is_some();
        if is_marker {
            difftrack_path::remove_in_place(&mut out, path);
        }
    }
    out
}

/// Returns `true` if any element of a collection carries a marker.
///
/// Arrays are scanned item by item and objects value by value; a scalar never
/// carries markers.
pub fn has_markers<S: AsRef<str>>(collection: &Value, marker_paths: &[S]) -> bool {
    match collection {
        Value::Array(items) => items
            .iter()
            .any(|item| marker_of(item, marker_paths).is_some()),
        Value::Object(map) => map
            .values()
            .any(|item| marker_of(item, marker_paths).is_some()),
        _ => false,
    }
}
