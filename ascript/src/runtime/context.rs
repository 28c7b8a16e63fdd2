use std::sync::Arc;

use ascript_api::address::ActorRef;
use ascript_api::context::ActorContext;
use ascript_api::errors::ActorError;
use ascript_api::types::ActorResult;
use ascript_api::value::Value;

use crate::runtime::cell::{cell_of, ActorCell, ActorState, Termination};
use crate::runtime::system::RuntimeCore;

/// Message produced by a handler, queued when the handler returns.
pub(crate) enum Outgoing {
    Send {
        target: Arc<ActorCell>,
        input: String,
        args: Vec<Value>,
    },
    Emit {
        output: String,
        args: Vec<Value>,
    },
}

/// [`ActorContext`] handed to constructor and handler bodies.
///
/// Holds the actor's state for the duration of one call. Arguments of sends
/// and emissions are deep-frozen at the call site, so later writes by the
/// handler cannot reach the receiver.
pub(crate) struct HandlerContext<'a> {
    core: &'a Arc<RuntimeCore>,
    cell: &'a Arc<ActorCell>,
    state: &'a mut ActorState,
    outbox: Vec<Outgoing>,
}

fn share_all(args: Vec<Value>) -> Vec<Value> {
    args.iter().map(Value::share).collect()
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(
        core: &'a Arc<RuntimeCore>,
        cell: &'a Arc<ActorCell>,
        state: &'a mut ActorState,
    ) -> Self {
        Self {
            core,
            cell,
            state,
            outbox: Vec::new(),
        }
    }

    pub(crate) fn into_outbox(self) -> Vec<Outgoing> {
        self.outbox
    }

    fn request(&mut self, termination: Termination) {
        // The first request of a call wins
        if self.state.pending.is_none() {
            self.state.pending = Some(termination);
        }
    }
}

impl ActorContext for HandlerContext<'_> {
    fn this(&self) -> ActorRef {
        self.cell.actor_ref()
    }

    fn parent(&self) -> Option<ActorRef> {
        self.cell.parent().map(|parent| parent.actor_ref())
    }

    fn field(&self, name: &str) -> Value {
        self.state.fields.get(name).cloned().unwrap_or(Value::Null)
    }

    fn set_field(&mut self, name: &str, value: Value) {
        self.state.fields.insert(name.to_string(), value);
    }

    fn emit(&mut self, output: &str, args: Vec<Value>) -> ActorResult<()> {
        if !self.cell.definition().has_output(output) {
            return Err(ActorError::UnknownOutput {
                actor: self.cell.path().to_string(),
                output: output.to_string(),
            });
        }
        self.outbox.push(Outgoing::Emit {
            output: output.to_string(),
            args: share_all(args),
        });
        Ok(())
    }

    fn send(&mut self, target: &ActorRef, input: &str, args: Vec<Value>) -> ActorResult<()> {
        let target = cell_of(target)?;
        if target.system_id() != self.core.system_id {
            return Err(ActorError::TypeError(format!(
                "{} belongs to another runtime",
                target.path()
            )));
        }
        self.outbox.push(Outgoing::Send {
            target,
            input: input.to_string(),
            args: share_all(args),
        });
        Ok(())
    }

    fn spawn(&mut self, definition: &str, args: Vec<Value>) -> ActorResult<ActorRef> {
        let definition = self
            .core
            .definitions
            .get(definition)
            .ok_or_else(|| ActorError::UnknownDefinition(definition.to_string()))?;
        self.core
            .spawn_actor(definition, args, Some(self.cell), false)
    }

    fn stop(&mut self, result: Value) {
        self.request(Termination::Stop(result));
    }

    fn fail(&mut self, error: ActorError) {
        self.request(Termination::Fail(error));
    }

    fn global(&self, name: &str) -> Value {
        self.state.globals.get(name)
    }

    fn set_global(&mut self, name: &str, value: Value) {
        let value = value.share();
        self.core.scope.set(name, value.clone());
        self.state.globals.set(name, value);
    }
}
