//! Item identity for array reconciliation.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Function extracting an id from an item.
pub type IdExtractor = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// How the id of an object-array item is determined.
#[derive(Clone)]
pub enum Identity {
    /// Read the id from a top-level field of the item.
    Field(String),
    /// Compute the id with a caller-supplied function.
    Extractor(IdExtractor),
}

impl Identity {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn extractor<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self::Extractor(Arc::new(f))
    }

    /// The raw id value of `item`, if it has one.
    pub fn id_of(&self, item: &Value) -> Option<Value> {
        match self {
            Self::Field(field) => item.get(field.as_str()).filter(|id| !id.is_null()).cloned(),
            Self::Extractor(extract) => extract(item),
        }
    }

    /// The lookup key of `item`, see [`identity_key`].
    pub fn key_of(&self, item: &Value) -> Option<String> {
        self.id_of(item).map(|id| identity_key(&id))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Self::Extractor(_) => f.write_str("Extractor(..)"),
        }
    }
}

impl From<&str> for Identity {
    fn from(field: &str) -> Self {
        Self::field(field)
    }
}

impl From<String> for Identity {
    fn from(field: String) -> Self {
        Self::Field(field)
    }
}

/// Map an id value to the string used as a lookup key.
///
/// Strings are used verbatim; every other value uses its JSON rendering, so
/// the number `1` and the string `"1"` share a key.
pub fn identity_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
