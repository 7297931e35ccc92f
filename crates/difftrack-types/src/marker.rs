//! Diff markers injected into annotated items for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Name of the field a marker is written to.
pub const MARKER_FIELD: &str = "diff";

/// Paths scanned (and stripped) when no explicit marker paths are given.
pub const DEFAULT_MARKER_PATHS: [&str; 3] = ["/data/diff", "/diff", "/meta/diff"];

/// How an item differs between the old and new collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMarker {
    Added,
    Changed,
    Removed,
}

impl DiffMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
        }
    }

    /// Interpret a value found at a marker path.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| s.parse().ok())
    }
}

impl From<DiffMarker> for Value {
    fn from(marker: DiffMarker) -> Self {
        Value::String(marker.as_str().to_string())
    }
}

impl fmt::Display for DiffMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffMarker {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(Self::Added),
            "changed" => Ok(Self::Changed),
            "removed" => Ok(Self::Removed),
            other => Err(TypeError::UnknownMarker(other.to_string())),
        }
    }
}
