//! Freeze, deep freeze and unfreeze.
//!
//! All three operations return a new node and leave their input untouched.

use std::collections::HashMap;
use std::sync::Arc;

use super::object::{NodeId, Object, Storage};
use super::{Mutability, Value};

impl Object {
    /// Returns a frozen alias of the current contents.
    ///
    /// Only the top-level node is frozen. When every member is already
    /// immutable all the way down the alias is tagged `DeepFrozen`.
    pub fn freeze(&self) -> Object {
        let storage = self.snapshot();
        let mutability = if self.mutability() == Mutability::DeepFrozen
            || storage.values().all(Value::is_deep_frozen)
        {
            Mutability::DeepFrozen
        } else {
            Mutability::Frozen
        };
        Object::from_storage(storage, mutability)
    }

    /// Returns a deep-frozen copy of the reachable graph.
    ///
    /// Members that are already deep-frozen are reused as they are. Cycles
    /// are rebuilt as deep-frozen cycles.
    pub fn deep_freeze(&self) -> Object {
        if self.mutability() == Mutability::DeepFrozen {
            return Object::from_storage(self.snapshot(), Mutability::DeepFrozen);
        }
        let mut visited = HashMap::new();
        deep_freeze_node(self, &mut visited)
    }

    /// Returns a mutable version of this object.
    ///
    /// The shallow form shares members with the input; the deep form copies
    /// every reachable node.
    pub fn unfreeze(&self, deep: bool) -> Object {
        if deep {
            let mut visited = HashMap::new();
            deep_copy_node(self, &mut visited)
        } else {
            // Storage stays shared until the first write forks it
            Object::from_storage(self.snapshot(), Mutability::Mutable)
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.mutability() != Mutability::Mutable
    }

    pub fn is_deep_frozen(&self) -> bool {
        self.mutability() == Mutability::DeepFrozen
    }
}

fn deep_freeze_node(obj: &Object, visited: &mut HashMap<NodeId, Object>) -> Object {
    if let Some(done) = visited.get(&obj.id()) {
        return done.clone();
    }
    let storage = obj.snapshot();
    let frozen = Object::from_storage(
        Arc::new(Storage::empty(obj.kind())),
        Mutability::DeepFrozen,
    );
    visited.insert(obj.id(), frozen.clone());
    let rebuilt = storage.map_values(|member| match member {
        Value::Object(child) if child.is_deep_frozen() => member.clone(),
        Value::Object(child) => Value::Object(deep_freeze_node(child, visited)),
        other => other.clone(),
    });
    frozen.install(rebuilt);
    frozen
}

fn deep_copy_node(obj: &Object, visited: &mut HashMap<NodeId, Object>) -> Object {
    if let Some(done) = visited.get(&obj.id()) {
        return done.clone();
    }
    let storage = obj.snapshot();
    let copy = Object::from_storage(
        Arc::new(Storage::empty(obj.kind())),
        Mutability::Mutable,
    );
    visited.insert(obj.id(), copy.clone());
    let rebuilt = storage.map_values(|member| match member {
        Value::Object(child) => Value::Object(deep_copy_node(child, visited)),
        other => other.clone(),
    });
    copy.install(rebuilt);
    copy
}

impl Value {
    /// Shallow freeze. Non-objects are already immutable and returned as is.
    pub fn freeze(&self) -> Value {
        match self {
            Value::Object(obj) => Value::Object(obj.freeze()),
            other => other.clone(),
        }
    }

    pub fn deep_freeze(&self) -> Value {
        match self {
            Value::Object(obj) => Value::Object(obj.deep_freeze()),
            other => other.clone(),
        }
    }

    pub fn unfreeze(&self, deep: bool) -> Value {
        match self {
            Value::Object(obj) => Value::Object(obj.unfreeze(deep)),
            other => other.clone(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Object(obj) => obj.is_frozen(),
            _ => true,
        }
    }

    pub fn is_deep_frozen(&self) -> bool {
        match self {
            Value::Object(obj) => obj.is_deep_frozen(),
            _ => true,
        }
    }

    /// Prepares a value for crossing an actor boundary.
    ///
    /// Deep-frozen values are passed by reference; anything else is replaced
    /// by a deep-frozen copy, so the receiver can never reach a mutable node
    /// owned by the sender.
    pub fn share(&self) -> Value {
        match self {
            Value::Object(obj) if !obj.is_deep_frozen() => Value::Object(obj.deep_freeze()),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freeze_promotes_flat_records() {
        let flat = Object::record([("x", Value::from(5))]);
        assert!(flat.freeze().is_deep_frozen());

        let nested = Object::record([("inner", Value::record([("y", Value::from(1))]))]);
        let frozen = nested.freeze();
        assert!(frozen.is_frozen());
        assert!(!frozen.is_deep_frozen());
    }

    #[test]
    fn test_share_reuses_deep_frozen_values() {
        let value = Value::record([("x", Value::from(1))]).deep_freeze();
        assert!(value.share().same(&value));

        let mutable = Value::record([("x", Value::from(1))]);
        let shared = mutable.share();
        assert!(!shared.same(&mutable));
        assert!(shared.is_deep_frozen());
    }

    #[test]
    fn test_deep_unfreeze_preserves_cycles() {
        let obj = Object::record([("a", Value::from(1))]);
        obj.set("me", Value::Object(obj.clone())).unwrap();
        let copy = obj.deep_freeze().unfreeze(true);
        let me = copy.get("me");
        assert!(me.as_object().unwrap().ptr_eq(&copy));
        assert!(!copy.is_frozen());
    }
}
