//! Per-key registration options.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use difftrack_bridge::StateSetter;
use difftrack_types::{DiffChecker, DiffMode, PatchOp};

/// Projection from `(old, new, patches)` to the value readers see.
///
/// Typically calls one of the annotators in `difftrack-annotate` to mark
/// what changed.
pub type ComputeStateFn = Arc<dyn Fn(&Value, &Value, &[PatchOp]) -> Value + Send + Sync>;

/// Options supplied when a key is first registered.
///
/// ```rust
/// use difftrack_store::{DiffChecker, DiffMode, RegisterOptions};
///
/// let options = RegisterOptions::new()
///     .diff_mode(DiffMode::HoldAccept)
///     .checker(DiffChecker::ignore(["/pos"]));
/// assert_eq!(options.diff_mode, Some(DiffMode::HoldAccept));
/// ```
#[derive(Clone, Default)]
pub struct RegisterOptions {
    /// Diff mode of the key; the engine default when `None`.
    pub diff_mode: Option<DiffMode>,
    /// Projection producing the computed state.
    pub compute_state: Option<ComputeStateFn>,
    /// Filter applied when deciding whether an array item changed.
    pub checker: Option<DiffChecker>,
    /// External setter notified with the raw new state.
    pub setter: Option<StateSetter>,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff_mode(mut self, diff_mode: DiffMode) -> Self {
        self.diff_mode = Some(diff_mode);
        self
    }

    pub fn compute_state<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value, &[PatchOp]) -> Value + Send + Sync + 'static,
    {
        self.compute_state = Some(Arc::new(f));
        self
    }

    pub fn checker(mut self, checker: DiffChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for RegisterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterOptions")
            .field("diff_mode", &self.diff_mode)
            .field("compute_state", &self.compute_state.is_some())
            .field("checker", &self.checker)
            .field("setter", &self.setter.is_some())
            .finish()
    }
}
