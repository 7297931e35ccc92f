//! Path-prefix filters applied to a patch list before deciding whether an
//! item counts as changed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::patch::PatchOp;

/// Whether the listed fields are dropped or exclusively kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckerKind {
    /// Drop every patch under one of the fields.
    Ignore,
    /// Keep only patches under one of the fields.
    Listen,
}

impl fmt::Display for CheckerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => f.write_str("ignore"),
            Self::Listen => f.write_str("listen"),
        }
    }
}

impl FromStr for CheckerKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "listen" => Ok(Self::Listen),
            other => Err(TypeError::UnknownCheckerKind(other.to_string())),
        }
    }
}

/// A path-prefix filter over patch operations.
///
/// Fields are matched as literal string prefixes of a patch path, so `/pos`
/// covers `/pos` and everything below it. A field written without a leading
/// `/` is normalized by prefixing one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChecker {
    #[serde(rename = "type")]
    pub kind: CheckerKind,
    pub fields: Vec<String>,
}

impl DiffChecker {
    pub fn ignore<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: CheckerKind::Ignore,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn listen<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: CheckerKind::Listen,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The configured fields, each guaranteed to start with `/`.
    pub fn normalized_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| {
                if field.starts_with('/') {
                    field.clone()
                } else {
                    format!("/{field}")
                }
            })
            .collect()
    }

    /// Returns `true` if `patch` survives this filter.
    pub fn retains(&self, patch: &PatchOp) -> bool {
        let fields = self.normalized_fields();
        self.retains_with(&fields, patch)
    }

    /// Filter a patch list, keeping only the operations that count as changes.
    pub fn filter(&self, patches: &[PatchOp]) -> Vec<PatchOp> {
        let fields = self.normalized_fields();
        patches
            .iter()
            .filter(|patch| self.retains_with(&fields, patch))
            .cloned()
            .collect()
    }

    fn retains_with(&self, fields: &[String], patch: &PatchOp) -> bool {
        let matched = fields.iter().any(|field| patch.path_starts_with(field));
        match self.kind {
            CheckerKind::Ignore => !matched,
            CheckerKind::Listen => matched,
        }
    }
}
