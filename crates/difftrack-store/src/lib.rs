//! Diff-tracked state store.
//!
//! This crate is the heart of difftrack. For every tracked key it holds an
//! old/new/computed triple, a linear undo history and a redo stack, and
//! exposes the operations that move a key between its clean and diffing
//! states:
//!
//! - Registration and proposed writes (`register_diff_state`,
//!   `new_diff_state`, `apply_patches_to_diff_state`)
//! - Whole-key reconciliation (`accept_all_diffs`, `reject_all_diffs`)
//! - Path-scoped reconciliation of fields, object arrays and scalar arrays
//!   (`accept_diff`, `reject_diff`)
//! - History navigation (`undo`, `redo`)
//!
//! Every mutation ends by handing the key's computed state to the
//! [`ExternalStateBridge`](difftrack_bridge::ExternalStateBridge).
//!
//! # Quick Start
//!
//! ```rust
//! use difftrack_store::{DiffStateStore, RegisterOptions};
//! use serde_json::json;
//!
//! let store = DiffStateStore::new();
//! store.register_diff_state("doc", json!({"title": "A"}), RegisterOptions::new());
//! store.new_diff_state("doc", json!({"title": "B"}), Some(true));
//!
//! assert_eq!(store.get_old_state("doc"), Some(json!({"title": "A"})));
//! assert!(store.accept_all_diffs("doc"));
//! assert_eq!(store.get_old_state("doc"), Some(json!({"title": "B"})));
//! ```

pub mod config;
pub mod error;
pub mod options;
mod resolve;
pub mod selection;
pub mod state;
pub mod store;

pub use config::EngineConfig;
pub use error::{StoreError, StoreResult};
pub use options::{ComputeStateFn, RegisterOptions};
pub use selection::DiffSelection;
pub use state::{DiffHistoryState, DiffState};
pub use store::DiffStateStore;

pub use difftrack_annotate::Identity;
pub use difftrack_bridge::{InMemoryStateRegistry, StateRegistry, StateSetter};
pub use difftrack_types::{DiffChecker, DiffMarker, DiffMode, PatchOp};
