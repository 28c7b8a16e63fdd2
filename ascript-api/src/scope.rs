//! # Root Scope
//!
//! Names visible to every actor of one runtime, such as a test's `result`
//! variable. The scope is an explicit object handed to the runtime rather than
//! process-wide state, so two runtimes never observe each other's names.
//!
//! An actor reads the scope through a [`ScopeSnapshot`] taken when it was
//! spawned: later writes by other code are not visible to it, while its own
//! writes are.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::value::Value;

type Vars = Arc<BTreeMap<String, Value>>;

/// Shared, injectable top-level scope.
///
/// Every actor can read it, so stored values are deep-frozen on write.
#[derive(Debug, Clone, Default)]
pub struct RootScope {
    vars: Arc<RwLock<Vars>>,
}

impl RootScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a name; unknown names read as `Null`.
    pub fn get(&self, name: &str) -> Value {
        self.current().get(name)
    }

    pub fn set(&self, name: &str, value: Value) {
        let value = value.share();
        let mut vars = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *vars).insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.current().contains(name)
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let mut vars = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *vars).remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.current().names()
    }

    /// Captures the current names. The snapshot shares storage with the
    /// scope until either side is written.
    pub fn snapshot(&self) -> ScopeSnapshot {
        self.current()
    }

    fn current(&self) -> ScopeSnapshot {
        ScopeSnapshot {
            vars: self.vars.read().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }
}

/// Point-in-time view of a [`RootScope`].
#[derive(Debug, Clone, Default)]
pub struct ScopeSnapshot {
    vars: Vars,
}

impl ScopeSnapshot {
    pub fn get(&self, name: &str) -> Value {
        self.vars.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    /// Records a write made by the snapshot's owner.
    pub fn set(&mut self, name: &str, value: Value) {
        Arc::make_mut(&mut self.vars).insert(name.to_string(), value.share());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_deep_freezes_value() {
        let scope = RootScope::new();
        let value = Value::record([("x", Value::from(1))]);
        scope.set("global1", value.clone());
        value.set("x", Value::from(2)).unwrap();

        let stored = scope.get("global1");
        assert!(stored.is_deep_frozen());
        assert_eq!(stored.get("x"), Value::from(1));
    }

    #[test]
    fn test_clones_share_names() {
        let scope = RootScope::new();
        let other = scope.clone();
        other.set("result", Value::from("done"));
        assert!(scope.contains("result"));
        assert_eq!(scope.names(), vec!["result".to_string()]);
        assert!(scope.get("missing").is_null());
    }

    #[test]
    fn test_snapshot_ignores_later_writes() {
        let scope = RootScope::new();
        scope.set("global1", Value::from(12));
        let mut snapshot = scope.snapshot();
        scope.set("global1", Value::from(25));

        assert_eq!(snapshot.get("global1"), Value::from(12));
        snapshot.set("own", Value::from(true));
        assert!(snapshot.contains("own"));
        assert!(!scope.contains("own"));
    }
}
