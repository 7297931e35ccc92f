//! Error types for the store crate.
//!
//! Expected control-flow states (unknown key, nothing to undo, no diff to
//! accept) are reported as `false`/`None` by the store operations, never as
//! errors. Errors only arise from the typed helpers converting between Rust
//! types and JSON values.

/// Errors that can occur in typed store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Converting a typed value to or from JSON failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;
