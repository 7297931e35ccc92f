//! Patch application.
//!
//! Application is best effort rather than strict RFC-6902: `add` and
//! `replace` create missing intermediate objects, removing a path that does
//! not resolve is skipped, and a `replace` past the end of an array pads the
//! gap with `null`.

use serde_json::Value;

use difftrack_types::{PatchOp, PatchOpKind};

/// Apply `patches` in order to a copy of `value`.
pub fn apply_patches(value: &Value, patches: &[PatchOp]) -> Value {
    let mut out = value.clone();
    for patch in patches {
        apply_patch(&mut out, patch);
    }
    out
}

/// Apply a single patch operation in place.
pub fn apply_patch(target: &mut Value, patch: &PatchOp) {
    let value = patch.value.clone().unwrap_or(Value::Null);
    match patch.op {
        PatchOpKind::Add => difftrack_path::insert_in_place(target, &patch.path, value),
        PatchOpKind::Replace => difftrack_path::set_in_place(target, &patch.path, value),
        PatchOpKind::Remove => {
            difftrack_path::remove_in_place(target, &patch.path);
        }
    }
}
