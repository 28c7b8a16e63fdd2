use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::{Mutability, Value};
use crate::errors::ActorError;
use crate::types::ActorResult;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable, process-unique identity of an object node.
///
/// Graph walks (deep freeze, deep unfreeze, equality, rendering) key their
/// visited sets by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Shape of an object node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Record,
    Array,
}

#[derive(Debug, Clone)]
pub(crate) enum Storage {
    Record(BTreeMap<String, Value>),
    Array(Vec<Value>),
}

impl Storage {
    pub(crate) fn empty(kind: ObjectKind) -> Storage {
        match kind {
            ObjectKind::Record => Storage::Record(BTreeMap::new()),
            ObjectKind::Array => Storage::Array(Vec::new()),
        }
    }

    /// Rebuilds the storage with every member passed through `f`.
    pub(crate) fn map_values<F>(&self, mut f: F) -> Storage
    where
        F: FnMut(&Value) -> Value,
    {
        match self {
            Storage::Record(map) => {
                Storage::Record(map.iter().map(|(k, v)| (k.clone(), f(v))).collect())
            }
            Storage::Array(items) => Storage::Array(items.iter().map(f).collect()),
        }
    }

    pub(crate) fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Storage::Record(map) => Box::new(map.values()),
            Storage::Array(items) => Box::new(items.iter()),
        }
    }
}

struct Node {
    id: NodeId,
    kind: ObjectKind,
    mutability: Mutability,
    storage: RwLock<Arc<Storage>>,
}

/// Reference to a record or array node.
///
/// Cloning an `Object` clones the reference, not the contents.
#[derive(Clone)]
pub struct Object(Arc<Node>);

fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    key.parse().ok()
}

impl Object {
    /// Creates a mutable record.
    pub fn record<K, I>(entries: I) -> Object
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Object::from_storage(Arc::new(Storage::Record(map)), Mutability::Mutable)
    }

    /// Creates a mutable array.
    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Object {
        Object::from_storage(
            Arc::new(Storage::Array(items.into_iter().collect())),
            Mutability::Mutable,
        )
    }

    pub(crate) fn from_storage(storage: Arc<Storage>, mutability: Mutability) -> Object {
        let kind = match storage.as_ref() {
            Storage::Record(_) => ObjectKind::Record,
            Storage::Array(_) => ObjectKind::Array,
        };
        Object(Arc::new(Node {
            id: NodeId::next(),
            kind,
            mutability,
            storage: RwLock::new(storage),
        }))
    }

    /// Replaces the storage of a node that has not been published yet.
    ///
    /// Skips the mutability check; graph rebuilding uses it to fill in
    /// placeholders created before recursing.
    pub(crate) fn install(&self, storage: Storage) {
        let mut guard = self.0.storage.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(storage);
    }

    /// Current storage snapshot. Walks iterate over snapshots so no lock is
    /// held while visiting children.
    pub(crate) fn snapshot(&self) -> Arc<Storage> {
        self.0
            .storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.0.kind
    }

    pub fn mutability(&self) -> Mutability {
        self.0.mutability
    }

    pub fn is_array(&self) -> bool {
        self.0.kind == ObjectKind::Array
    }

    /// Whether both references point at the same node.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Reads a member. Arrays accept numeric keys and `length`.
    pub fn get(&self, key: &str) -> Value {
        match self.snapshot().as_ref() {
            Storage::Record(map) => map.get(key).cloned().unwrap_or(Value::Null),
            Storage::Array(items) => {
                if key == "length" {
                    return Value::from(items.len());
                }
                parse_index(key)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::Null)
            }
        }
    }

    pub fn get_index(&self, index: usize) -> Value {
        match self.snapshot().as_ref() {
            Storage::Array(items) => items.get(index).cloned().unwrap_or(Value::Null),
            Storage::Record(map) => map.get(&index.to_string()).cloned().unwrap_or(Value::Null),
        }
    }

    pub fn len(&self) -> usize {
        match self.snapshot().as_ref() {
            Storage::Record(map) => map.len(),
            Storage::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Member names: record keys in order, or array indices.
    pub fn keys(&self) -> Vec<String> {
        match self.snapshot().as_ref() {
            Storage::Record(map) => map.keys().cloned().collect(),
            Storage::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    pub fn values(&self) -> Vec<Value> {
        self.snapshot().values().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        match self.snapshot().as_ref() {
            Storage::Record(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Storage::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
        }
    }

    /// Writes a member.
    ///
    /// # Errors
    /// * `ImmutableWriteError` when the node is frozen
    /// * `TypeError` for a non-numeric key on an array
    pub fn set(&self, key: &str, value: Value) -> ActorResult<()> {
        if self.is_array() {
            let index = parse_index(key).ok_or_else(|| {
                ActorError::TypeError(format!("Invalid array index '{}'", key))
            })?;
            return self.set_index(index, value);
        }
        self.write(key, |storage| {
            if let Storage::Record(map) = storage {
                map.insert(key.to_string(), value);
            }
            Ok(())
        })
    }

    /// Writes an element; writing past the end fills the gap with `Null`.
    pub fn set_index(&self, index: usize, value: Value) -> ActorResult<()> {
        self.write(&index.to_string(), |storage| {
            match storage {
                Storage::Array(items) => {
                    if index >= items.len() {
                        items.resize(index + 1, Value::Null);
                    }
                    items[index] = value;
                }
                Storage::Record(map) => {
                    map.insert(index.to_string(), value);
                }
            }
            Ok(())
        })
    }

    /// Appends to an array and returns the new length.
    pub fn push(&self, value: Value) -> ActorResult<usize> {
        self.write("push", |storage| match storage {
            Storage::Array(items) => {
                items.push(value);
                Ok(items.len())
            }
            Storage::Record(_) => Err(ActorError::TypeError("push on a record".to_string())),
        })
    }

    /// Removes a record member, returning its previous value.
    pub fn remove(&self, key: &str) -> ActorResult<Value> {
        self.write(key, |storage| match storage {
            Storage::Record(map) => Ok(map.remove(key).unwrap_or(Value::Null)),
            Storage::Array(_) => Err(ActorError::TypeError(format!(
                "Cannot remove '{}' from an array",
                key
            ))),
        })
    }

    fn write<R, F>(&self, key: &str, f: F) -> ActorResult<R>
    where
        F: FnOnce(&mut Storage) -> ActorResult<R>,
    {
        if self.0.mutability != Mutability::Mutable {
            return Err(ActorError::ImmutableWriteError {
                key: key.to_string(),
                mutability: self.0.mutability,
            });
        }
        let mut guard = self.0.storage.write().unwrap_or_else(PoisonError::into_inner);
        // Forks the storage when a frozen alias still holds it
        let storage = Arc::make_mut(&mut *guard);
        f(storage)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("mutability", &self.0.mutability)
            .finish()
    }
}
