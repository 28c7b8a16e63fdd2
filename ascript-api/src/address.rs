//! # Actor Addressing
//!
//! Identities and references that let script code name a live actor.
//!
//! ## Key Concepts
//! - [`ActorId`]: unique, stable identity assigned at spawn
//! - [`ActorHandle`]: the runtime-side object behind a reference
//! - [`ActorRef`]: cloneable, immutable handle stored in script values
//!
//! An `ActorRef` is an ordinary immutable value: it may be stored in fields,
//! sent in messages and compared, and it keeps answering status queries after
//! the actor has terminated.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::ActorError;
use crate::value::Value;

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Unique actor identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    /// Allocates the next process-unique id.
    pub fn next() -> Self {
        ActorId(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle status of an actor instance.
///
/// `Running` transitions to `Stopped` or `Failed` exactly once.
#[derive(Debug, Clone)]
pub enum ActorStatus {
    /// Fields allocated, constructor or bindings still in progress
    Starting,
    /// Accepting and processing messages
    Running,
    /// Terminated normally with a result
    Stopped(Value),
    /// Terminated by an unrecovered error
    Failed(ActorError),
}

impl ActorStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ActorStatus::Running)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, ActorStatus::Stopped(_) | ActorStatus::Failed(_))
    }

    /// The stop result, `Null` unless stopped normally.
    pub fn result(&self) -> Value {
        match self {
            ActorStatus::Stopped(value) => value.clone(),
            _ => Value::Null,
        }
    }

    pub fn error(&self) -> Option<ActorError> {
        match self {
            ActorStatus::Failed(error) => Some(error.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorStatus::Starting => write!(f, "starting"),
            ActorStatus::Running => write!(f, "running"),
            ActorStatus::Stopped(_) => write!(f, "stopped"),
            ActorStatus::Failed(_) => write!(f, "failed"),
        }
    }
}

/// Runtime object behind an [`ActorRef`].
pub trait ActorHandle: Send + Sync + fmt::Debug {
    fn id(&self) -> ActorId;

    /// Hierarchical path, e.g. `ascript://<system>/EchoTest#1/Echo#2`
    fn path(&self) -> &str;

    fn definition_name(&self) -> &str;

    fn status(&self) -> ActorStatus;

    /// Lets the owning runtime recover its concrete type.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Reference to an actor instance.
#[derive(Clone)]
pub struct ActorRef(Arc<dyn ActorHandle>);

impl ActorRef {
    pub fn new(handle: Arc<dyn ActorHandle>) -> Self {
        Self(handle)
    }

    pub fn id(&self) -> ActorId {
        self.0.id()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn definition_name(&self) -> &str {
        self.0.definition_name()
    }

    pub fn status(&self) -> ActorStatus {
        self.0.status()
    }

    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    /// Result of a stopped actor; `Null` while it is running or if it failed.
    pub fn result(&self) -> Value {
        self.status().result()
    }

    /// Error of a failed actor.
    pub fn error(&self) -> Option<ActorError> {
        self.status().error()
    }

    /// Recovers the runtime's concrete handle type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().as_any().downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &ActorRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorRef({})", self.path())
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
