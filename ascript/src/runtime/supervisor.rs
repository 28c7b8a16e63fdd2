//! # Termination and Supervision
//!
//! Everything that happens when an actor stops or fails:
//! 1. Record the final status (exactly once)
//! 2. Drop its fields, bindings and directory entry
//! 3. Tell the parent through `childStopped(child, result, error)`
//! 4. Stop the children when the actor's policy asks for it
//! 5. Close the mailbox, discarding whatever is still queued
//!
//! A parent that does not declare `childStopped` falls back to its
//! [`UnhandledChildStop`](ascript_api::supervisor::UnhandledChildStop) policy,
//! see `runtime::dispatch`.

use std::sync::{Arc, PoisonError};

use tracing::{debug, error, warn};

use ascript_api::errors::ActorError;
use ascript_api::message::{MessageOrigin, CHILD_STOPPED};
use ascript_api::supervisor::ChildTermination;
use ascript_api::value::Value;

use crate::log_lifecycle;
use crate::runtime::cell::{ActorCell, Termination};
use crate::runtime::dispatch::STOP_REQUEST;
use crate::runtime::system::RuntimeCore;

impl RuntimeCore {
    /// Moves `cell` to its final status and releases everything it holds.
    ///
    /// Must be called by whoever holds the actor's execution slot, by its
    /// constructor, or after the workers are gone. Later calls are no-ops.
    pub(crate) fn terminate(&self, cell: &Arc<ActorCell>, how: Termination) {
        self.release(cell, how, true);
    }

    /// Fails an actor whose construction was rejected. The error goes back to
    /// the spawning code only, so neither the parent nor the host is told.
    pub(crate) fn abort_construction(&self, cell: &Arc<ActorCell>, error: ActorError) {
        self.release(cell, Termination::Fail(error), false);
    }

    fn release(&self, cell: &Arc<ActorCell>, how: Termination, report: bool) {
        let how = how.shared();
        if !cell.finish(&how) {
            return;
        }
        match &how {
            Termination::Stop(result) => {
                log_lifecycle!(cell.path(), "stopped", result = %result);
            }
            Termination::Fail(error) => {
                log_lifecycle!(cell.path(), "failed", error = %error);
            }
        }

        // Fields may hold references back to this actor
        cell.lock_state().fields.clear();
        let unbound = self.bindings.remove_actor(cell.id());
        if unbound > 0 {
            debug!(actor = cell.path(), unbound, "Bindings removed");
        }
        self.directory.remove(cell.id());

        let monitored = self
            .monitored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&cell.id());
        if let Termination::Fail(error) = &how {
            let surfaced = !cell.has_parent() && self.config.surface_unsupervised_failures;
            if report && (monitored || surfaced) {
                self.record_root_failure(cell, error.clone());
            }
        }

        if report {
            self.notify_parent(cell, &how);
        }
        self.cascade(cell);

        let discarded = cell.mailbox.close();
        if discarded > 0 {
            debug!(actor = cell.path(), discarded, "Queued messages discarded");
        }
        self.messages_done(discarded);
    }

    fn notify_parent(&self, cell: &Arc<ActorCell>, how: &Termination) {
        let Some(parent) = cell.parent() else {
            return;
        };
        let (result, error) = match how {
            Termination::Stop(result) => (result.clone(), Value::Null),
            Termination::Fail(error) => (Value::Null, error.to_value().share()),
        };
        let delivered = self.enqueue(
            &parent,
            CHILD_STOPPED,
            vec![Value::Actor(cell.actor_ref()), result, error],
            MessageOrigin::Supervision { child: cell.id() },
        );
        if !delivered {
            debug!(actor = cell.path(), parent = parent.path(), "Parent gone, childStopped dropped");
        }
    }

    fn cascade(&self, cell: &Arc<ActorCell>) {
        if cell.supervision().child_termination != ChildTermination::StopChildren {
            return;
        }
        for child in cell.children() {
            if !child.status().is_terminated() {
                debug!(actor = cell.path(), child = child.path(), "Stopping child");
                self.request_stop(&child, Value::Null);
            }
        }
    }

    /// Asks `cell` to stop once the messages queued before this request are
    /// handled.
    ///
    /// Returns false when the actor has already terminated.
    pub(crate) fn request_stop(&self, cell: &Arc<ActorCell>, result: Value) -> bool {
        if cell.status().is_terminated() {
            return false;
        }
        self.enqueue(
            cell,
            STOP_REQUEST,
            vec![result.share()],
            MessageOrigin::Direct { sender: None },
        )
    }

    fn record_root_failure(&self, cell: &ActorCell, failure: ActorError) {
        error!(actor = cell.path(), error = %failure, "Root actor failed");
        let mut slot = self.root_failure.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some((cell.path().to_string(), failure));
        } else {
            warn!(actor = cell.path(), "Earlier root failure still unreported");
        }
    }

    /// Takes the first failure not yet reported to the host.
    pub(crate) fn take_root_failure(&self) -> Option<(String, ActorError)> {
        self.root_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
