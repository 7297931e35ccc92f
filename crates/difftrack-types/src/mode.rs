use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Determines which side of a tracked key a plain read exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffMode {
    /// Proposed values are visible immediately; the clean value is `new_state`.
    #[default]
    DefaultAccept,
    /// Proposed values wait for acceptance; the clean value is `old_state`.
    HoldAccept,
}

impl DiffMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultAccept => "defaultAccept",
            Self::HoldAccept => "holdAccept",
        }
    }
}

impl fmt::Display for DiffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffMode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "defaultAccept" => Ok(Self::DefaultAccept),
            "holdAccept" => Ok(Self::HoldAccept),
            other => Err(TypeError::UnknownDiffMode(other.to_string())),
        }
    }
}
