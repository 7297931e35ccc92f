//! The [`StateRegistry`] boundary and its in-memory implementation.
//!
//! The registry is the generic key/value store the rest of the application
//! reads current values from. Any backend implements this trait; the engine
//! only ever seeds initial values from it and pushes computed values into it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

/// Storage for the current, externally visible value of each key.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait StateRegistry: Send + Sync {
    /// Read the current value of `key`.
    ///
    /// Returns `None` if the key has never been set.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write (create or overwrite) the current value of `key`.
    fn set(&self, key: &str, value: Value);
}

/// An in-memory implementation of [`StateRegistry`].
///
/// All data lives in a `HashMap` behind a `RwLock` and is lost when the
/// registry is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStateRegistry {
    values: RwLock<HashMap<String, Value>>,
}

impl InMemoryStateRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the registry holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the value of `key`. Returns `true` if it existed.
    pub fn remove(&self, key: &str) -> bool {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key).is_some()
    }

    /// Sorted list of every key in the registry.
    pub fn keys(&self) -> Vec<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl StateRegistry for InMemoryStateRegistry {
    fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
    }
}
