//! # Handler Context
//!
//! The interface handler bodies use to reach the runtime. An implementation is
//! handed to every [`Handler`](crate::actor::Handler) invocation and is only
//! valid for the duration of that call.
//!
//! ## Effects
//! Messages sent or emitted through the context are queued when the call
//! returns, in the order they were issued. A stop or failure requested through
//! the context takes effect at the same point.

use crate::address::ActorRef;
use crate::errors::ActorError;
use crate::types::ActorResult;
use crate::value::Value;

pub trait ActorContext {
    /// Reference to the running actor.
    fn this(&self) -> ActorRef;

    /// The actor that spawned this one, if any.
    fn parent(&self) -> Option<ActorRef>;

    /// Reads a field of the running actor; unknown fields read as `Null`.
    fn field(&self, name: &str) -> Value;

    /// Writes a field of the running actor. Fields are private, so the value
    /// is stored as is.
    fn set_field(&mut self, name: &str, value: Value);

    /// Emits through one of this actor's output ports.
    ///
    /// # Errors
    /// `UnknownOutput` when the port is not declared.
    fn emit(&mut self, output: &str, args: Vec<Value>) -> ActorResult<()>;

    /// Calls an input of another actor (or this one) asynchronously.
    fn send(&mut self, target: &ActorRef, input: &str, args: Vec<Value>) -> ActorResult<()>;

    /// Spawns a child of the running actor. The child is constructed before
    /// this returns.
    fn spawn(&mut self, definition: &str, args: Vec<Value>) -> ActorResult<ActorRef>;

    /// Stops the running actor with `result` once the current call returns.
    fn stop(&mut self, result: Value);

    /// Fails the running actor with `error` once the current call returns.
    fn fail(&mut self, error: ActorError);

    /// Reads a root scope name.
    fn global(&self, name: &str) -> Value;

    /// Writes a root scope name; the value is deep-frozen.
    fn set_global(&mut self, name: &str, value: Value);
}
