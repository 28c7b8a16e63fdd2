//! Message delivery: enqueueing, scheduling slices and handler invocation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use ascript_api::errors::ActorError;
use ascript_api::message::{Message, MessageOrigin};
use ascript_api::supervisor::UnhandledChildStop;
use ascript_api::types::{ActorResult, BoxedHandler};
use ascript_api::value::Value;

use crate::runtime::cell::{cell_of, ActorCell, Termination};
use crate::runtime::context::{HandlerContext, Outgoing};
use crate::runtime::system::RuntimeCore;
use crate::{actor_span, log_scheduler, message_span};

/// Reserved input carrying a cooperative stop request. Not a valid script
/// identifier, so it cannot collide with a declared input.
pub(crate) const STOP_REQUEST: &str = "@stop";

/// Outcome of one constructor or handler call.
pub(crate) struct Invocation {
    pub result: ActorResult<Value>,
    pub outbox: Vec<Outgoing>,
    pub pending: Option<Termination>,
}

impl Invocation {
    fn failed(error: ActorError) -> Self {
        Self {
            result: Err(error),
            outbox: Vec::new(),
            pending: None,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Binds message arguments to declared parameters; missing ones are `Null`.
fn bind_args(mut args: Vec<Value>, params: usize) -> Vec<Value> {
    if args.len() < params {
        args.resize(params, Value::Null);
    }
    args
}

impl RuntimeCore {
    /// Queues `args` (already shared) for `input` of `target`.
    ///
    /// Returns false when the message was dropped because the target has
    /// terminated or the runtime is shutting down.
    pub(crate) fn enqueue(
        &self,
        target: &Arc<ActorCell>,
        input: &str,
        args: Vec<Value>,
        origin: MessageOrigin,
    ) -> bool {
        if self.is_shutting_down() {
            debug!(actor = target.path(), input, "Runtime shutting down, message dropped");
            return false;
        }
        // Counted before the push so a fast consumer cannot underflow it
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        match target.mailbox.push(input, args, origin) {
            Ok(seq) => {
                trace!(actor = target.path(), input, seq, "Message queued");
                // Actors still under construction are scheduled once running
                if target.is_running() {
                    self.schedule(target);
                }
                true
            }
            Err(_) => {
                debug!(actor = target.path(), input, "Target not running, message dropped");
                self.messages_done(1);
                false
            }
        }
    }

    pub(crate) fn schedule(&self, cell: &Arc<ActorCell>) {
        if cell.try_mark_runnable() {
            log_scheduler!("run_queue", "queued", actor = cell.path());
            self.run_queue.push(cell.clone());
        }
    }

    pub(crate) fn messages_done(&self, count: usize) {
        if count == 0 {
            return;
        }
        if self.in_flight.fetch_sub(count, Ordering::SeqCst) == count {
            self.quiescent.notify_waiters();
        }
    }

    /// Handles up to `max_messages_per_run` messages of one actor.
    ///
    /// The caller must have taken `cell` off the run queue, which makes it
    /// the only party executing this actor.
    pub(crate) fn run_slice(self: &Arc<Self>, cell: Arc<ActorCell>) {
        cell.begin_run();
        let span = actor_span!(cell.definition().name(), cell.path());
        let _guard = span.enter();

        let mut handled = 0;
        while handled < self.config.max_messages_per_run {
            let Some(message) = cell.mailbox.try_pop() else {
                break;
            };
            self.deliver(&cell, message);
            // Counted down after the handler's own messages were queued
            self.messages_done(1);
            handled += 1;
        }

        cell.end_run();
        log_scheduler!("run_queue", "released", actor = cell.path(), handled = handled);
        if !cell.mailbox.is_empty() {
            self.schedule(&cell);
        }
    }

    fn deliver(self: &Arc<Self>, cell: &Arc<ActorCell>, message: Message) {
        if !cell.is_running() {
            debug!(handler = %message.handler, "Actor not running, message dropped");
            return;
        }
        let span = message_span!(message.handler.as_str(), seq = message.seq);
        let _guard = span.enter();

        if message.handler == STOP_REQUEST {
            let result = message.args.into_iter().next().unwrap_or(Value::Null);
            self.terminate(cell, Termination::Stop(result));
            return;
        }

        let invocation = match cell.definition().input(&message.handler) {
            Some(handler) => {
                let args = bind_args(message.args, handler.params.len());
                let body = handler.body.clone();
                self.invoke(cell, &body, args)
            }
            None if message.is_child_stopped() => {
                self.default_child_stopped(cell, &message);
                return;
            }
            None => Invocation::failed(ActorError::UnmatchedHandlerError {
                actor: cell.path().to_string(),
                handler: message.handler.clone(),
            }),
        };
        self.complete(cell, invocation);
    }

    /// Runs a body against the actor's state.
    pub(crate) fn invoke(
        self: &Arc<Self>,
        cell: &Arc<ActorCell>,
        body: &BoxedHandler,
        args: Vec<Value>,
    ) -> Invocation {
        let mut state = cell.lock_state();
        let mut ctx = HandlerContext::new(self, cell, &mut state);

        let result = if self.config.catch_handler_panics {
            panic::catch_unwind(AssertUnwindSafe(|| body.invoke(&mut ctx, args)))
                .unwrap_or_else(|payload| Err(ActorError::Panicked(panic_message(&*payload))))
        } else {
            body.invoke(&mut ctx, args)
        };

        let outbox = ctx.into_outbox();
        let pending = state.pending.take();
        Invocation {
            result,
            outbox,
            pending,
        }
    }

    /// Publishes a finished handler's messages, then applies any stop or
    /// failure it caused.
    fn complete(self: &Arc<Self>, cell: &Arc<ActorCell>, invocation: Invocation) {
        self.flush(cell, invocation.outbox);
        match (invocation.result, invocation.pending) {
            (Err(error), _) => {
                warn!(actor = cell.path(), error = %error, "Handler failed");
                self.terminate(cell, Termination::Fail(error));
            }
            (Ok(_), Some(termination)) => self.terminate(cell, termination),
            (Ok(_), None) => {}
        }
    }

    pub(crate) fn flush(&self, cell: &Arc<ActorCell>, outbox: Vec<Outgoing>) {
        for outgoing in outbox {
            match outgoing {
                Outgoing::Send {
                    target,
                    input,
                    args,
                } => {
                    self.enqueue(
                        &target,
                        &input,
                        args,
                        MessageOrigin::Direct {
                            sender: Some(cell.id()),
                        },
                    );
                }
                Outgoing::Emit { output, args } => self.route_emission(cell, &output, args),
            }
        }
    }

    /// Delivers an emission to every input bound to `source.output`.
    pub(crate) fn route_emission(&self, source: &Arc<ActorCell>, output: &str, args: Vec<Value>) {
        let subscriptions = self.bindings.subscribers(source.id(), output);
        if subscriptions.is_empty() {
            debug!(source = source.path(), output, "No binding, emission dropped");
            return;
        }
        for subscription in subscriptions {
            self.enqueue(
                &subscription.subscriber,
                &subscription.input,
                args.clone(),
                MessageOrigin::Bound {
                    source: source.id(),
                    output: output.to_string(),
                },
            );
        }
    }

    /// `childStopped` for an actor that does not declare it.
    fn default_child_stopped(self: &Arc<Self>, cell: &Arc<ActorCell>, message: &Message) {
        let child = message.args.first().cloned().unwrap_or(Value::Null);
        let error = message.args.get(2).cloned().unwrap_or(Value::Null);
        if error.is_null() {
            debug!(child = %child, "Child stopped");
            return;
        }
        match cell.supervision().unhandled_child_stop {
            UnhandledChildStop::Ignore => {
                debug!(child = %child, error = %error, "Child failure ignored");
            }
            UnhandledChildStop::Escalate => {
                // Prefer the child's own error over its rendered value
                let escalated = child
                    .as_actor()
                    .and_then(|actor| cell_of(actor).ok())
                    .and_then(|child| child.status().error())
                    .unwrap_or(ActorError::Thrown(error));
                warn!(child = %child, error = %escalated, "Escalating child failure");
                self.terminate(cell, Termination::Fail(escalated));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_args_pads_missing_parameters() {
        let args = bind_args(vec![Value::from(1)], 3);
        assert_eq!(args.len(), 3);
        assert!(args[2].is_null());

        let extra = bind_args(vec![Value::from(1), Value::from(2)], 1);
        assert_eq!(extra.len(), 2);
    }

    #[test]
    fn test_panic_message_extracts_strings() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
    }
}
