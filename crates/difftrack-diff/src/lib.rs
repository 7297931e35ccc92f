//! Structural compare for the difftrack state engine.
//!
//! Computes a patch list describing the difference between two JSON values
//! and applies patch lists back onto values. The comparison is a plain
//! structural walk (object keys, array elements by index, scalar equality);
//! it does not search for a minimal edit script.
//!
//! # Key Items
//!
//! - [`diff`] - patch list turning one value into another
//! - [`apply_patches`] - non-mutating, best-effort patch application
//! - [`DiffSummary`] - operation counts over a patch list
//! - [`is_changed`] - structural difference filtered by a [`DiffChecker`]
//!
//! [`DiffChecker`]: difftrack_types::DiffChecker

pub mod apply;
pub mod compare;
pub mod summary;

pub use apply::{apply_patch, apply_patches};
pub use compare::{diff, is_changed};
pub use summary::DiffSummary;
