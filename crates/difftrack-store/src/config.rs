use serde::{Deserialize, Serialize};

use difftrack_types::{DiffMode, DEFAULT_MARKER_PATHS};

/// Configuration for a [`DiffStateStore`](crate::DiffStateStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Diff mode used for keys registered without an explicit one.
    pub default_diff_mode: DiffMode,
    /// Marker paths stripped and scanned when a selection names none.
    pub marker_paths: Vec<String>,
    /// Maximum number of history entries kept per key. `None` keeps all;
    /// beyond the cap the oldest entries are dropped.
    pub max_history: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_diff_mode: DiffMode::DefaultAccept,
            marker_paths: DEFAULT_MARKER_PATHS.iter().map(|p| p.to_string()).collect(),
            max_history: None,
        }
    }
}

impl EngineConfig {
    /// A configuration keeping at most `max_history` undo steps per key.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history: Some(max_history),
            ..Default::default()
        }
    }
}
