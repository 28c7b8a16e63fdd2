use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use ascript_api::actor::ActorDefinition;
use ascript_api::address::ActorId;
use ascript_api::errors::ActorError;
use ascript_api::types::ActorResult;

use crate::runtime::cell::ActorCell;

/// Actor definitions by name. Definitions are never replaced.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: RwLock<HashMap<String, Arc<ActorDefinition>>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, definition: ActorDefinition) -> ActorResult<Arc<ActorDefinition>> {
        let mut definitions = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if definitions.contains_key(definition.name()) {
            return Err(ActorError::DuplicateDefinitionError(
                definition.name().to_string(),
            ));
        }
        let definition = Arc::new(definition);
        definitions.insert(definition.name().to_string(), definition.clone());
        Ok(definition)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ActorDefinition>> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

/// Live (starting or running) actors. A terminated actor is removed and
/// stays reachable only through the references other code still holds.
#[derive(Debug, Default)]
pub struct ActorDirectory {
    actors: RwLock<HashMap<ActorId, Arc<ActorCell>>>,
}

impl ActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, cell: Arc<ActorCell>) {
        self.actors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cell.id(), cell);
    }

    pub fn remove(&self, id: ActorId) -> Option<Arc<ActorCell>> {
        self.actors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<Arc<ActorCell>> {
        self.actors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.actors.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<Arc<ActorCell>> {
        self.actors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascript_api::value::Value;

    #[test]
    fn test_register_rejects_duplicate_names() {
        let registry = DefinitionRegistry::new();
        let def = || {
            ActorDefinition::builder("Echo")
                .input("ping", &[], |_, _| Ok(Value::Null))
                .build()
                .unwrap()
        };
        registry.register(def()).unwrap();
        assert!(matches!(
            registry.register(def()),
            Err(ActorError::DuplicateDefinitionError(name)) if name == "Echo"
        ));
        assert!(registry.get("Echo").is_some());
        assert!(registry.get("Missing").is_none());
    }
}
