use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use uuid::Uuid;

use ascript_api::actor::ActorDefinition;
use ascript_api::address::{ActorHandle, ActorId, ActorRef, ActorStatus};
use ascript_api::errors::ActorError;
use ascript_api::scope::ScopeSnapshot;
use ascript_api::supervisor::SupervisionPolicy;
use ascript_api::value::Value;

use crate::runtime::mailbox::Mailbox;

/// Scheduling state of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedState {
    /// Not queued and not executing
    Idle = 0,
    /// Queued in the run queue
    Runnable = 1,
    /// A worker is running its handlers
    Executing = 2,
}

impl From<usize> for SchedState {
    fn from(value: usize) -> Self {
        match value {
            1 => SchedState::Runnable,
            2 => SchedState::Executing,
            _ => SchedState::Idle,
        }
    }
}

/// How an actor ends.
#[derive(Debug, Clone)]
pub(crate) enum Termination {
    Stop(Value),
    Fail(ActorError),
}

impl Termination {
    /// The same termination with its result or thrown value deep-frozen, so
    /// every holder of the actor's reference reads one immutable value.
    pub(crate) fn shared(self) -> Self {
        match self {
            Termination::Stop(value) => Termination::Stop(value.share()),
            Termination::Fail(ActorError::Thrown(value)) => {
                Termination::Fail(ActorError::Thrown(value.share()))
            }
            other => other,
        }
    }
}

/// State owned by the actor and touched only by whoever holds its
/// execution slot (or by its constructor).
pub(crate) struct ActorState {
    pub fields: HashMap<String, Value>,
    /// Root scope as it was when the actor was spawned, plus its own writes
    pub globals: ScopeSnapshot,
    /// Stop or failure requested by the running handler
    pub pending: Option<Termination>,
}

/// One live actor instance.
///
/// The cell is the runtime object behind every [`ActorRef`]. Its mailbox
/// is the only part other actors touch.
pub struct ActorCell {
    id: ActorId,
    system: Uuid,
    path: String,
    definition: Arc<ActorDefinition>,
    supervision: SupervisionPolicy,
    parent: Option<Weak<ActorCell>>,
    children: Mutex<Vec<Weak<ActorCell>>>,
    pub(crate) mailbox: Mailbox,
    sched: AtomicUsize,
    status: Mutex<ActorStatus>,
    pub(crate) state: Mutex<ActorState>,
}

impl ActorCell {
    pub(crate) fn new(
        system: Uuid,
        definition: Arc<ActorDefinition>,
        supervision: SupervisionPolicy,
        parent: Option<&Arc<ActorCell>>,
        fields: HashMap<String, Value>,
        globals: ScopeSnapshot,
    ) -> Arc<Self> {
        let id = ActorId::next();
        let path = match parent {
            Some(parent) => format!("{}/{}{}", parent.path, definition.name(), id),
            None => format!("ascript://{}/{}{}", system, definition.name(), id),
        };
        Arc::new(Self {
            id,
            system,
            path,
            definition,
            supervision,
            parent: parent.map(Arc::downgrade),
            children: Mutex::new(Vec::new()),
            mailbox: Mailbox::new(id),
            sched: AtomicUsize::new(SchedState::Idle as usize),
            status: Mutex::new(ActorStatus::Starting),
            state: Mutex::new(ActorState {
                fields,
                globals,
                pending: None,
            }),
        })
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn system_id(&self) -> Uuid {
        self.system
    }

    pub fn definition(&self) -> &Arc<ActorDefinition> {
        &self.definition
    }

    pub fn supervision(&self) -> &SupervisionPolicy {
        &self.supervision
    }

    /// The parent, while it is still alive.
    pub fn parent(&self) -> Option<Arc<ActorCell>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn status(&self) -> ActorStatus {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    pub fn sched_state(&self) -> SchedState {
        SchedState::from(self.sched.load(Ordering::SeqCst))
    }

    pub fn actor_ref(self: &Arc<Self>) -> ActorRef {
        ActorRef::new(self.clone())
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ActorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add_child(&self, child: &Arc<ActorCell>) {
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(child));
    }

    /// Children that are still alive.
    pub fn children(&self) -> Vec<Arc<ActorCell>> {
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub(crate) fn mark_running(&self) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*status, ActorStatus::Starting) {
            *status = ActorStatus::Running;
            true
        } else {
            false
        }
    }

    /// Records the final status. Only the first call has an effect.
    pub(crate) fn finish(&self, how: &Termination) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if status.is_terminated() {
            return false;
        }
        *status = match how {
            Termination::Stop(value) => ActorStatus::Stopped(value.clone()),
            Termination::Fail(error) => ActorStatus::Failed(error.clone()),
        };
        true
    }

    /// Idle -> Runnable. Returns false when the actor is already queued or
    /// executing.
    pub(crate) fn try_mark_runnable(&self) -> bool {
        self.sched
            .compare_exchange(
                SchedState::Idle as usize,
                SchedState::Runnable as usize,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub(crate) fn begin_run(&self) {
        self.sched.store(SchedState::Executing as usize, Ordering::SeqCst);
    }

    pub(crate) fn end_run(&self) {
        self.sched.store(SchedState::Idle as usize, Ordering::SeqCst);
    }
}

impl fmt::Debug for ActorCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCell")
            .field("path", &self.path)
            .field("status", &self.status())
            .field("sched", &self.sched_state())
            .field("mailbox", &self.mailbox.len())
            .finish()
    }
}

impl ActorHandle for ActorCell {
    fn id(&self) -> ActorId {
        self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn definition_name(&self) -> &str {
        self.definition.name()
    }

    fn status(&self) -> ActorStatus {
        ActorCell::status(self)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Recovers the cell behind a reference created by this crate.
pub(crate) fn cell_of(actor: &ActorRef) -> Result<Arc<ActorCell>, ActorError> {
    actor.downcast::<ActorCell>().ok_or_else(|| {
        ActorError::TypeError(format!("{} is not an actor of this runtime", actor.path()))
    })
}
