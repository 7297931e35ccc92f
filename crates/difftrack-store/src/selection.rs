use serde_json::Value;

use difftrack_annotate::Identity;

/// The part of a tracked value a path-scoped accept or reject applies to.
///
/// - `path` locates the sub-value in both the old and the new tree.
/// - `identity` keys object-array items (defaults to the `id` field).
/// - `target_id` restricts the operation to one item: an object-array id, or
///   the scalar value itself for scalar arrays. `None` processes every
///   changed item at `path`.
/// - `marker_paths` overrides the engine's configured marker paths.
#[derive(Clone, Debug)]
pub struct DiffSelection {
    pub path: String,
    pub identity: Identity,
    pub target_id: Option<Value>,
    pub marker_paths: Option<Vec<String>>,
}

impl DiffSelection {
    /// Select the value at `path`.
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            identity: Identity::field("id"),
            target_id: None,
            marker_paths: None,
        }
    }

    pub fn identity(mut self, identity: impl Into<Identity>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn target(mut self, target_id: impl Into<Value>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn marker_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.marker_paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }
}
