//! Messages queued in actor mailboxes.

use crate::address::ActorId;
use crate::value::Value;

/// Reserved input receiving `(child, result, error)` when a child terminates.
pub const CHILD_STOPPED: &str = "childStopped";

/// How a message entered the target's mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Direct call `target.input(args)`; `sender` is `None` outside any actor
    Direct { sender: Option<ActorId> },
    /// Emission through a bound output port
    Bound { source: ActorId, output: String },
    /// Synthesized by the runtime when a child terminated
    Supervision { child: ActorId },
}

/// A pending handler invocation.
///
/// Every composite argument is deep-frozen before the message is built.
#[derive(Debug, Clone)]
pub struct Message {
    pub target: ActorId,
    pub handler: String,
    pub args: Vec<Value>,
    /// Position in the target mailbox, monotonic per mailbox
    pub seq: u64,
    pub origin: MessageOrigin,
}

impl Message {
    pub fn is_child_stopped(&self) -> bool {
        self.handler == CHILD_STOPPED
    }
}
