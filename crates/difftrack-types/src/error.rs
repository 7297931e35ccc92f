use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown patch operation: {0}")]
    UnknownPatchOp(String),

    #[error("unknown diff mode: {0}")]
    UnknownDiffMode(String),

    #[error("unknown diff marker: {0}")]
    UnknownMarker(String),

    #[error("unknown checker type: {0}")]
    UnknownCheckerKind(String),
}
