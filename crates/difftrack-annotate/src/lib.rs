//! Diff marker annotators.
//!
//! Stateless reconciliation functions that compare an old and a new
//! collection and return an annotated copy of the new one, where every added,
//! changed or removed item carries a `diff` marker. They are meant to be
//! called from a tracked key's projection function so readers of the
//! computed state can render what changed.
//!
//! # Modules
//!
//! - [`annotate`] - [`annotate_object_array`], [`annotate_map`], [`annotate_primitive_array`]
//! - [`identity`] - [`Identity`], how an item's id is extracted
//! - [`markers`] - reading, writing and stripping markers

pub mod annotate;
pub mod identity;
pub mod markers;

pub use annotate::{annotate_map, annotate_object_array, annotate_primitive_array};
pub use identity::{identity_key, Identity};
pub use markers::{has_markers, mark, marker_of, strip_markers};
