//! Foundation types for the difftrack state engine.
//!
//! Every other difftrack crate depends on `difftrack-types`. Values themselves
//! are plain [`serde_json::Value`] trees; this crate only defines the
//! vocabulary used to describe and filter changes between them.
//!
//! # Key Types
//!
//! - [`PatchOp`] / [`PatchOpKind`] - RFC-6902-flavored add/replace/remove operation
//! - [`DiffChecker`] / [`CheckerKind`] - path-prefix filter over a patch list
//! - [`DiffMode`] - what a plain read of a tracked key returns
//! - [`DiffMarker`] - the `diff` annotation injected into changed items

pub mod checker;
pub mod error;
pub mod marker;
pub mod mode;
pub mod patch;

pub use checker::{CheckerKind, DiffChecker};
pub use error::TypeError;
pub use marker::{DiffMarker, DEFAULT_MARKER_PATHS, MARKER_FIELD};
pub use mode::DiffMode;
pub use patch::{PatchOp, PatchOpKind};
