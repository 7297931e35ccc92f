//! One-way propagation of computed state.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::registry::{InMemoryStateRegistry, StateRegistry};

/// External setter supplied at registration. Receives the raw new state.
pub type StateSetter = Arc<dyn Fn(&Value) + Send + Sync>;

/// A pending notification produced by an engine mutation.
///
/// The engine builds one and hands it to [`ExternalStateBridge::publish`]
/// while it still holds the key's lock, so registry writes for one key land
/// in mutation order. The returned [`Delivery`] is run after the lock is
/// released, so setters may freely read the engine.
#[derive(Clone)]
pub struct Propagation {
    pub key: String,
    pub computed: Value,
    pub new_state: Value,
    pub setter: Option<StateSetter>,
}

impl fmt::Debug for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Propagation")
            .field("key", &self.key)
            .field("computed", &self.computed)
            .field("new_state", &self.new_state)
            .field("has_setter", &self.setter.is_some())
            .finish()
    }
}

/// The setter call owed after a successful [`ExternalStateBridge::publish`].
pub struct Delivery {
    new_state: Value,
    setter: Option<StateSetter>,
}

impl Delivery {
    /// Hand the raw new state to the key's setter, if it has one.
    pub fn deliver(self) {
        if let Some(setter) = self.setter {
            setter(&self.new_state);
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("new_state", &self.new_state)
            .field("has_setter", &self.setter.is_some())
            .finish()
    }
}

/// Pushes computed values out to a [`StateRegistry`] and to per-key setters.
///
/// The bridge remembers the last computed value it pushed for every key and
/// stays silent when asked to push the same value again, which keeps setters
/// that write back into the application from looping.
pub struct ExternalStateBridge {
    registry: Arc<dyn StateRegistry>,
    last_seen: RwLock<HashMap<String, Value>>,
}

impl ExternalStateBridge {
    pub fn new(registry: Arc<dyn StateRegistry>) -> Self {
        Self {
            registry,
            last_seen: RwLock::new(HashMap::new()),
        }
    }

    /// The registry this bridge writes to.
    pub fn registry(&self) -> &Arc<dyn StateRegistry> {
        &self.registry
    }

    /// Read the registry's current value for `key`, used to seed registrations.
    pub fn seed(&self, key: &str) -> Option<Value> {
        self.registry.get(key)
    }

    /// The last computed value pushed for `key`.
    pub fn last_seen(&self, key: &str) -> Option<Value> {
        let last_seen = self.last_seen.read().unwrap_or_else(PoisonError::into_inner);
        last_seen.get(key).cloned()
    }

    /// Record the initial value of a freshly registered key.
    ///
    /// Writes the registry but does not invoke any setter: the value came
    /// from the caller in the first place.
    pub fn prime(&self, key: &str, computed: &Value) {
        self.remember(key, computed);
        self.registry.set(key, computed.clone());
    }

    /// Write a notification's computed value to the registry if it is new.
    ///
    /// Returns the setter call still owed to the application, or `None` when
    /// the value was already pushed. Callers serializing mutations per key
    /// must call this before releasing their lock.
    pub fn publish(&self, propagation: Propagation) -> Option<Delivery> {
        let Propagation {
            key,
            computed,
            new_state,
            setter,
        } = propagation;

        let mut last_seen = self.last_seen.write().unwrap_or_else(PoisonError::into_inner);
        if last_seen.get(&key) == Some(&computed) {
            debug!(key = %key, "computed state unchanged; skipping propagation");
            return None;
        }
        last_seen.insert(key.clone(), computed.clone());
        drop(last_seen);

        self.registry.set(&key, computed);
        debug!(key = %key, "computed state propagated");
        Some(Delivery { new_state, setter })
    }

    /// [`publish`](Self::publish) and deliver in one step.
    ///
    /// Returns `true` if the registry was written and the setter (if any)
    /// invoked.
    pub fn emit(&self, propagation: Propagation) -> bool {
        match self.publish(propagation) {
            Some(delivery) => {
                delivery.deliver();
                true
            }
            None => false,
        }
    }

    /// Forget the last value pushed for `key`.
    ///
    /// The registry keeps its value; it belongs to the application.
    pub fn forget(&self, key: &str) {
        self.last_seen
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn remember(&self, key: &str, computed: &Value) {
        self.last_seen
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), computed.clone());
    }
}

impl Default for ExternalStateBridge {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryStateRegistry::new()))
    }
}

impl fmt::Debug for ExternalStateBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracked = self
            .last_seen
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ExternalStateBridge")
            .field("tracked", &tracked)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recording_setter() -> (StateSetter, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let setter: StateSetter = Arc::new(move |value: &Value| {
            sink.lock().unwrap().push(value.clone());
        });
        (setter, seen)
    }

    fn propagation(computed: Value, new_state: Value, setter: &StateSetter) -> Propagation {
        Propagation {
            key: "doc".into(),
            computed,
            new_state,
            setter: Some(Arc::clone(setter)),
        }
    }

    #[test]
    fn setter_receives_new_state_and_registry_receives_computed() {
        let bridge = ExternalStateBridge::default();
        let (setter, seen) = recording_setter();

        let computed = json!([{"id": 1, "diff": "added"}]);
        let raw = json!([{"id": 1}]);
        assert!(bridge.emit(propagation(computed.clone(), raw.clone(), &setter)));

        assert_eq!(bridge.registry().get("doc"), Some(computed.clone()));
        assert_eq!(bridge.last_seen("doc"), Some(computed));
        assert_eq!(*seen.lock().unwrap(), vec![raw]);
    }

    #[test]
    fn repeated_value_is_not_propagated() {
        let bridge = ExternalStateBridge::default();
        let (setter, seen) = recording_setter();

        assert!(bridge.emit(propagation(json!(1), json!(1), &setter)));
        assert!(!bridge.emit(propagation(json!(1), json!(2), &setter)));
        assert!(bridge.emit(propagation(json!(3), json!(3), &setter)));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn prime_does_not_call_setter() {
        let bridge = ExternalStateBridge::default();
        let (setter, seen) = recording_setter();

        bridge.prime("doc", &json!({"a": 1}));
        assert!(!bridge.emit(propagation(json!({"a": 1}), json!({"a": 1}), &setter)));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(bridge.seed("doc"), Some(json!({"a": 1})));
    }

    #[test]
    fn publish_writes_registry_before_setter_runs() {
        let bridge = ExternalStateBridge::default();
        let (setter, seen) = recording_setter();

        let delivery = bridge
            .publish(propagation(json!(2), json!(2), &setter))
            .unwrap();
        assert_eq!(bridge.registry().get("doc"), Some(json!(2)));
        assert!(seen.lock().unwrap().is_empty());

        delivery.deliver();
        assert_eq!(*seen.lock().unwrap(), vec![json!(2)]);
        assert!(bridge.publish(propagation(json!(2), json!(2), &setter)).is_none());
    }

    #[test]
    fn forget_clears_memory_but_keeps_registry_value() {
        let bridge = ExternalStateBridge::default();
        bridge.prime("doc", &json!(1));
        bridge.forget("doc");
        assert!(bridge.last_seen("doc").is_none());
        assert_eq!(bridge.seed("doc"), Some(json!(1)));
    }
}
