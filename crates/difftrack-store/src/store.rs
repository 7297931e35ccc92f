//! The diff-tracked state store.
//!
//! [`DiffStateStore`] owns one [`DiffHistoryState`] per tracked key. The key
//! map sits behind a `RwLock` and every entry behind its own `Mutex`, so
//! writes to different keys never contend and a single key is mutated by one
//! caller at a time.
//!
//! Mutations publish a [`Propagation`](difftrack_bridge::Propagation) to the
//! [`ExternalStateBridge`] while the entry is still locked, so the registry
//! sees one key's values in mutation order. Setters run after the lock is
//! released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use difftrack_bridge::{ExternalStateBridge, StateRegistry};
use difftrack_diff::apply_patches;
use difftrack_types::PatchOp;

use crate::config::EngineConfig;
use crate::error::StoreResult;
use crate::options::RegisterOptions;
use crate::selection::DiffSelection;
use crate::state::{DiffHistoryState, DiffState};

type Entry = Arc<Mutex<DiffHistoryState>>;

/// Engine instance holding every tracked key.
pub struct DiffStateStore {
    config: EngineConfig,
    entries: RwLock<HashMap<String, Entry>>,
    bridge: ExternalStateBridge,
}

impl DiffStateStore {
    /// Create a store with the default configuration and an in-memory registry.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_bridge(config, ExternalStateBridge::default())
    }

    /// Create a store that seeds from and propagates into `registry`.
    pub fn with_registry(config: EngineConfig, registry: Arc<dyn StateRegistry>) -> Self {
        Self::with_bridge(config, ExternalStateBridge::new(registry))
    }

    pub fn with_bridge(config: EngineConfig, bridge: ExternalStateBridge) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            bridge,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bridge(&self) -> &ExternalStateBridge {
        &self.bridge
    }

    // ---- Registration ----

    /// Start tracking `key` with `value`.
    ///
    /// Registering an existing key keeps its options and history. If `value`
    /// differs from both its new and computed state the call is treated as an
    /// external write and routed through [`new_diff_state`](Self::new_diff_state)
    /// with the key's current diff flag.
    ///
    /// Returns `true` if a new key was created or the existing key changed.
    pub fn register_diff_state(&self, key: &str, value: Value, options: RegisterOptions) -> bool {
        if let Some(existing) = self.entry(key) {
            return self.reregister(key, &existing, value);
        }

        // The projection may read the store, so it runs before any lock is taken.
        let state = DiffHistoryState::new(
            value.clone(),
            options,
            self.config.default_diff_mode,
            self.config.max_history,
        );
        let computed = state.diff_state.computed_state.clone();
        let diff_mode = state.diff_mode;
        let entry: Entry = Arc::new(Mutex::new(state));
        let guard = entry.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(key).cloned() {
            drop(entries);
            drop(guard);
            debug!(key, "lost registration race; treating as re-registration");
            return self.reregister(key, &existing, value);
        }
        entries.insert(key.to_string(), Arc::clone(&entry));
        drop(entries);

        debug!(key, diff_mode = %diff_mode, "registered diff state");
        self.bridge.prime(key, &computed);
        drop(guard);
        true
    }

    /// Register `key` with the value the external registry currently holds.
    ///
    /// Returns `false` if the registry has no value for `key`.
    pub fn register_from_registry(&self, key: &str, options: RegisterOptions) -> bool {
        match self.bridge.seed(key) {
            Some(value) => self.register_diff_state(key, value, options),
            None => {
                debug!(key, "registry has no value to seed from");
                false
            }
        }
    }

    /// Register `key` with any serializable value.
    pub fn register_typed<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: RegisterOptions,
    ) -> StoreResult<bool> {
        let value = serde_json::to_value(value)?;
        Ok(self.register_diff_state(key, value, options))
    }

    /// Stop tracking `key`, discarding its history.
    ///
    /// The registry keeps the last value propagated for `key`.
    pub fn unregister_diff_state(&self, key: &str) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some();
        if removed {
            self.bridge.forget(key);
            debug!(key, "unregistered diff state");
        }
        removed
    }

    // ---- Writes ----

    /// Propose a new value for `key`.
    ///
    /// `is_diff_change` stages the write as a diff (`Some(true)`), collapses
    /// old and new onto it (`Some(false)`), or keeps the key's current mode
    /// (`None`). Returns `false` if `key` is not registered.
    pub fn new_diff_state(&self, key: &str, proposed: Value, is_diff_change: Option<bool>) -> bool {
        self.mutate(key, |state| {
            state.propose(proposed, is_diff_change);
            true
        })
    }

    /// Propose the current new state of `key` with `patches` applied.
    pub fn apply_patches_to_diff_state(
        &self,
        key: &str,
        patches: &[PatchOp],
        is_diff_change: Option<bool>,
    ) -> bool {
        self.mutate(key, |state| {
            let proposed = apply_patches(&state.diff_state.new_state, patches);
            state.propose(proposed, is_diff_change);
            true
        })
    }

    // ---- Reconciliation ----

    /// Make the new state the baseline. `false` unless `key` is diffing.
    pub fn accept_all_diffs(&self, key: &str) -> bool {
        self.mutate(key, |state| state.settle(true))
    }

    /// Revert the new state to the baseline. `false` unless `key` is diffing.
    pub fn reject_all_diffs(&self, key: &str) -> bool {
        self.mutate(key, |state| state.settle(false))
    }

    /// Accept the part of the diff named by `selection`.
    ///
    /// ```rust
    /// use difftrack_store::{DiffSelection, DiffStateStore, RegisterOptions};
    /// use serde_json::json;
    ///
    /// let store = DiffStateStore::new();
    /// store.register_diff_state("k", json!({"tags": ["a"]}), RegisterOptions::new());
    /// store.new_diff_state("k", json!({"tags": ["a", "b"]}), Some(true));
    ///
    /// assert!(store.accept_diff("k", &DiffSelection::at("/tags").target("b")));
    /// assert_eq!(store.get_old_state("k"), Some(json!({"tags": ["a", "b"]})));
    /// ```
    pub fn accept_diff(&self, key: &str, selection: &DiffSelection) -> bool {
        self.resolve(key, selection, true)
    }

    /// Reject the part of the diff named by `selection`.
    pub fn reject_diff(&self, key: &str, selection: &DiffSelection) -> bool {
        self.resolve(key, selection, false)
    }

    // ---- History ----

    pub fn undo(&self, key: &str) -> bool {
        self.mutate(key, DiffHistoryState::undo)
    }

    pub fn redo(&self, key: &str) -> bool {
        self.mutate(key, DiffHistoryState::redo)
    }

    pub fn can_undo(&self, key: &str) -> bool {
        self.with_entry(key, |state| state.can_undo()).unwrap_or(false)
    }

    pub fn can_redo(&self, key: &str) -> bool {
        self.with_entry(key, |state| state.can_redo()).unwrap_or(false)
    }

    // ---- Readers ----

    /// A snapshot of the full lifecycle of `key`.
    pub fn get_diff_history_state(&self, key: &str) -> Option<DiffHistoryState> {
        self.with_entry(key, |state| state.clone())
    }

    pub fn get_diff_state(&self, key: &str) -> Option<DiffState> {
        self.with_entry(key, |state| state.diff_state.clone())
    }

    /// The plain value of `key`: new state under default-accept, old state
    /// under hold-accept.
    pub fn get_clean_state(&self, key: &str) -> Option<Value> {
        self.with_entry(key, |state| state.clean_state().clone())
    }

    pub fn get_computed_state(&self, key: &str) -> Option<Value> {
        self.with_entry(key, |state| state.diff_state.computed_state.clone())
    }

    pub fn get_old_state(&self, key: &str) -> Option<Value> {
        self.with_entry(key, |state| state.diff_state.old_state.clone())
    }

    pub fn get_new_state(&self, key: &str) -> Option<Value> {
        self.with_entry(key, |state| state.diff_state.new_state.clone())
    }

    /// The computed state of `key` deserialized into `T`.
    pub fn get_computed_as<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get_computed_state(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// All tracked keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---- Internal helpers ----

    fn entry(&self, key: &str) -> Option<Entry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn with_entry<R>(&self, key: &str, f: impl FnOnce(&mut DiffHistoryState) -> R) -> Option<R> {
        let entry = self.entry(key)?;
        let mut state = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut state))
    }

    /// Run a transition on `key` and propagate if it reports a change.
    ///
    /// The registry is written before the key's lock is released; the setter
    /// runs after.
    fn mutate(&self, key: &str, f: impl FnOnce(&mut DiffHistoryState) -> bool) -> bool {
        let outcome = self.with_entry(key, |state| {
            f(state).then(|| self.bridge.publish(state.propagation(key)))
        });
        match outcome {
            None => {
                debug!(key, "key is not registered");
                false
            }
            Some(None) => false,
            Some(Some(delivery)) => {
                if let Some(delivery) = delivery {
                    delivery.deliver();
                }
                true
            }
        }
    }

    /// Registration of a key that is already tracked.
    ///
    /// A value equal to the current new or computed state keeps everything;
    /// anything else is a write with the key's current diff flag.
    fn reregister(&self, key: &str, entry: &Entry, value: Value) -> bool {
        let delivery = {
            let mut state = entry.lock().unwrap_or_else(PoisonError::into_inner);
            let current = &state.diff_state;
            if value == current.new_state || value == current.computed_state {
                debug!(key, "re-registration with current value; keeping state");
                return false;
            }
            debug!(key, "re-registration with changed value; treating as write");
            state.propose(value, None);
            self.bridge.publish(state.propagation(key))
        };
        if let Some(delivery) = delivery {
            delivery.deliver();
        }
        true
    }

    fn resolve(&self, key: &str, selection: &DiffSelection, accept: bool) -> bool {
        let marker_paths = selection
            .marker_paths
            .as_deref()
            .unwrap_or(&self.config.marker_paths);
        self.mutate(key, |state| state.resolve(selection, marker_paths, accept))
    }
}

impl Default for DiffStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiffStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffStateStore")
            .field("config", &self.config)
            .field("keys", &self.keys())
            .finish()
    }
}
