//! Versioned state of a single tracked key and its transitions.
//!
//! The transitions here are plain synchronous methods on
//! [`DiffHistoryState`]; locking and external propagation live in
//! [`DiffStateStore`](crate::DiffStateStore).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use difftrack_annotate::has_markers;
use difftrack_bridge::{Propagation, StateSetter};
use difftrack_diff::diff;
use difftrack_types::{DiffChecker, DiffMode, PatchOp};

use crate::options::{ComputeStateFn, RegisterOptions};
use crate::resolve::{resolve, Resolved};
use crate::selection::DiffSelection;

/// One versioned snapshot of a tracked key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffState {
    /// Last accepted baseline.
    pub old_state: Value,
    /// Latest proposed value.
    pub new_state: Value,
    /// Projection of old/new that readers see.
    pub computed_state: Value,
    /// `true` while old and new differ (or the caller forced a diff).
    pub is_diff_mode: bool,
    /// Structural diff from baseline to new; informational.
    pub patches: Vec<PatchOp>,
}

impl DiffState {
    /// A clean snapshot where every side equals `value`.
    pub fn clean(value: Value, computed: Value) -> Self {
        Self {
            old_state: value.clone(),
            new_state: value,
            computed_state: computed,
            is_diff_mode: false,
            patches: Vec::new(),
        }
    }
}

/// The full lifecycle of one tracked key.
#[derive(Clone)]
pub struct DiffHistoryState {
    pub diff_state: DiffState,
    /// Past snapshots, oldest first.
    pub history: Vec<DiffState>,
    /// Snapshots popped by undo, most recent last.
    pub redo_stack: Vec<DiffState>,
    pub diff_mode: DiffMode,
    pub checker: Option<DiffChecker>,
    compute_state: Option<ComputeStateFn>,
    setter: Option<StateSetter>,
    max_history: Option<usize>,
}

impl DiffHistoryState {
    pub(crate) fn new(
        value: Value,
        options: RegisterOptions,
        default_mode: DiffMode,
        max_history: Option<usize>,
    ) -> Self {
        let mut state = Self {
            diff_state: DiffState::clean(value.clone(), value),
            history: Vec::new(),
            redo_stack: Vec::new(),
            diff_mode: options.diff_mode.unwrap_or(default_mode),
            checker: options.checker,
            compute_state: options.compute_state,
            setter: options.setter,
            max_history,
        };
        if state.compute_state.is_some() {
            let value = &state.diff_state.new_state;
            state.diff_state.computed_state = state.project(value, value, &[]);
        }
        state
    }

    /// Returns `true` if a projection function is configured.
    pub fn has_compute_state(&self) -> bool {
        self.compute_state.is_some()
    }

    /// The value a plain read returns: new state under
    /// [`DiffMode::DefaultAccept`], old state under [`DiffMode::HoldAccept`].
    pub fn clean_state(&self) -> &Value {
        match self.diff_mode {
            DiffMode::DefaultAccept => &self.diff_state.new_state,
            DiffMode::HoldAccept => &self.diff_state.old_state,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Run the projection, or fall back to the side selected by the diff mode.
    pub(crate) fn project(&self, old: &Value, new: &Value, patches: &[PatchOp]) -> Value {
        match &self.compute_state {
            Some(compute) => compute(old, new, patches),
            None => match self.diff_mode {
                DiffMode::DefaultAccept => new.clone(),
                DiffMode::HoldAccept => old.clone(),
            },
        }
    }

    pub(crate) fn propagation(&self, key: &str) -> Propagation {
        Propagation {
            key: key.to_string(),
            computed: self.diff_state.computed_state.clone(),
            new_state: self.diff_state.new_state.clone(),
            setter: self.setter.clone(),
        }
    }

    /// Record a proposed value.
    ///
    /// Without an explicit `is_diff_change` the key keeps its current diff
    /// mode. A non-diff write collapses old and new onto `proposed`; a diff
    /// write keeps the running baseline, or starts one from the current new
    /// state when the key was clean.
    pub(crate) fn propose(&mut self, proposed: Value, is_diff_change: Option<bool>) {
        self.record();

        let current = &self.diff_state;
        let diffing = is_diff_change.unwrap_or(current.is_diff_mode);
        let baseline = if !diffing {
            proposed.clone()
        } else if current.is_diff_mode {
            current.old_state.clone()
        } else {
            current.new_state.clone()
        };

        let patches = diff(&baseline, &proposed);
        let computed_state = self.project(&baseline, &proposed, &patches);
        let is_diff_mode = diffing && baseline != proposed;
        debug!(
            patches = patches.len(),
            is_diff_mode,
            history = self.history.len(),
            "new diff state"
        );

        self.diff_state = DiffState {
            old_state: baseline,
            new_state: proposed,
            computed_state,
            is_diff_mode,
            patches,
        };
    }

    /// Collapse the triple onto the new side (`accept`) or the old side.
    ///
    /// Returns `false` without touching anything when the key is not diffing.
    pub(crate) fn settle(&mut self, accept: bool) -> bool {
        if !self.diff_state.is_diff_mode {
            return false;
        }
        self.record();

        let value = if accept {
            self.diff_state.new_state.clone()
        } else {
            self.diff_state.old_state.clone()
        };
        let computed = self.project(&value, &value, &[]);
        debug!(accept, "settled all diffs");
        self.diff_state = DiffState::clean(value, computed);
        true
    }

    /// Accept or reject the part of the diff named by `selection`.
    pub(crate) fn resolve(
        &mut self,
        selection: &DiffSelection,
        marker_paths: &[String],
        accept: bool,
    ) -> bool {
        if !self.diff_state.is_diff_mode {
            debug!(path = %selection.path, "not in diff mode; nothing to resolve");
            return false;
        }

        let Some(resolved) = resolve(
            &self.diff_state,
            selection,
            marker_paths,
            self.checker.as_ref(),
            accept,
        ) else {
            debug!(path = %selection.path, accept, "no matching change to resolve");
            return false;
        };

        self.record();
        self.commit(resolved, &selection.path, marker_paths);
        true
    }

    pub(crate) fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.diff_state, previous);
        self.redo_stack.push(current);
        true
    }

    pub(crate) fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.diff_state, next);
        self.history.push(current);
        true
    }

    /// Store the outcome of a path-scoped resolution.
    ///
    /// Equal trees always end diff mode. A single-item object-array
    /// resolution on a projected key otherwise stays in diff mode only while
    /// markers remain in the computed array at `path` or the trees differ
    /// somewhere else, so changes the projection hides (for example through a
    /// checker) do not hold the key in diff mode.
    fn commit(&mut self, resolved: Resolved, path: &str, marker_paths: &[String]) {
        let Resolved {
            old_state,
            new_state,
            single_item,
        } = resolved;

        let patches = diff(&old_state, &new_state);
        let computed_state = self.project(&old_state, &new_state, &patches);

        let is_diff_mode = if old_state == new_state {
            false
        } else if single_item && self.compute_state.is_some() {
            let markers_remain = difftrack_path::get(&computed_state, path)
                .is_some_and(|collection| has_markers(collection, marker_paths));
            markers_remain || differs_outside(&old_state, &new_state, path)
        } else {
            true
        };
        debug!(path, single_item, is_diff_mode, "resolved diff");

        self.diff_state = DiffState {
            old_state,
            new_state,
            computed_state,
            is_diff_mode,
            patches,
        };
    }

    /// Push the current snapshot onto history and invalidate redo.
    fn record(&mut self) {
        self.history.push(self.diff_state.clone());
        self.redo_stack.clear();
        if let Some(max) = self.max_history {
            let excess = self.history.len().saturating_sub(max);
            self.history.drain(..excess);
        }
    }
}

impl fmt::Debug for DiffHistoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffHistoryState")
            .field("diff_state", &self.diff_state)
            .field("history", &self.history.len())
            .field("redo_stack", &self.redo_stack.len())
            .field("diff_mode", &self.diff_mode)
            .field("checker", &self.checker)
            .field("compute_state", &self.compute_state.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// Whether `old` and `new` differ anywhere other than at `path`.
fn differs_outside(old: &Value, new: &Value, path: &str) -> bool {
    difftrack_path::set(old, path, Value::Null) != difftrack_path::set(new, path, Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tracked(value: Value) -> DiffHistoryState {
        DiffHistoryState::new(value, RegisterOptions::new(), DiffMode::DefaultAccept, None)
    }

    #[test]
    fn fresh_state_is_clean() {
        let state = tracked(json!({"a": 1}));
        assert!(!state.diff_state.is_diff_mode);
        assert_eq!(state.diff_state.computed_state, json!({"a": 1}));
        assert!(!state.can_undo());
        assert!(!state.can_redo());
    }

    #[test]
    fn first_diff_write_starts_from_previous_new_state() {
        let mut state = tracked(json!({"a": 1}));
        state.propose(json!({"a": 2}), None);
        assert!(!state.diff_state.is_diff_mode);
        assert_eq!(state.diff_state.old_state, json!({"a": 2}));

        state.propose(json!({"a": 3}), Some(true));
        assert!(state.diff_state.is_diff_mode);
        assert_eq!(state.diff_state.old_state, json!({"a": 2}));
        assert_eq!(state.diff_state.patches, vec![PatchOp::replace("/a", json!(3))]);
    }

    #[test]
    fn diff_writes_keep_baseline_and_inherit_mode() {
        let mut state = tracked(json!(0));
        state.propose(json!(1), Some(true));
        state.propose(json!(2), None);
        assert!(state.diff_state.is_diff_mode);
        assert_eq!(state.diff_state.old_state, json!(0));
        assert_eq!(state.diff_state.new_state, json!(2));
    }

    #[test]
    fn writing_back_the_baseline_ends_diff_mode() {
        let mut state = tracked(json!("a"));
        state.propose(json!("b"), Some(true));
        state.propose(json!("a"), Some(true));
        assert!(!state.diff_state.is_diff_mode);
        assert!(state.diff_state.patches.is_empty());
    }

    #[test]
    fn hold_accept_computes_old_side() {
        let options = RegisterOptions::new().diff_mode(DiffMode::HoldAccept);
        let mut state = DiffHistoryState::new(json!(1), options, DiffMode::DefaultAccept, None);
        state.propose(json!(2), Some(true));
        assert_eq!(state.diff_state.computed_state, json!(1));
        assert_eq!(state.clean_state(), &json!(1));
    }

    #[test]
    fn projection_receives_baseline_and_patches() {
        let options = RegisterOptions::new().compute_state(|old, new, patches| {
            json!({"old": old, "new": new, "ops": patches.len()})
        });
        let mut state = DiffHistoryState::new(json!(1), options, DiffMode::DefaultAccept, None);
        assert_eq!(state.diff_state.computed_state, json!({"old": 1, "new": 1, "ops": 0}));

        state.propose(json!(2), Some(true));
        assert_eq!(state.diff_state.computed_state, json!({"old": 1, "new": 2, "ops": 1}));
    }

    #[test]
    fn settle_requires_diff_mode() {
        let mut state = tracked(json!(1));
        assert!(!state.settle(true));
        assert!(state.history.is_empty());

        state.propose(json!(2), Some(true));
        assert!(state.settle(false));
        assert_eq!(state.diff_state, DiffState::clean(json!(1), json!(1)));
        assert!(!state.settle(false));
    }

    #[test]
    fn new_write_clears_redo() {
        let mut state = tracked(json!(1));
        state.propose(json!(2), Some(true));
        assert!(state.undo());
        assert!(state.can_redo());
        state.propose(json!(3), Some(true));
        assert!(!state.can_redo());
        assert!(!state.redo());
    }

    #[test]
    fn history_is_capped() {
        let mut state =
            DiffHistoryState::new(json!(0), RegisterOptions::new(), DiffMode::DefaultAccept, Some(2));
        for n in 1..=5 {
            state.propose(json!(n), Some(true));
        }
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0].new_state, json!(3));
        assert_eq!(state.history[1].new_state, json!(4));
    }

    #[test]
    fn differs_outside_masks_path() {
        let old = json!({"list": [1], "title": "A"});
        let new = json!({"list": [1, 2], "title": "A"});
        assert!(!differs_outside(&old, &new, "/list"));
        assert!(differs_outside(&old, &json!({"list": [1], "title": "B"}), "/list"));
    }
}
