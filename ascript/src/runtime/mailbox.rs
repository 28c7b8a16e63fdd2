use std::fmt;
use std::sync::{Mutex, PoisonError};

use flume::{Receiver, Sender};

use ascript_api::address::ActorId;
use ascript_api::message::{Message, MessageOrigin};
use ascript_api::value::Value;

use crate::runtime::error::MailboxError;

struct MailboxState {
    next_seq: u64,
    closed: bool,
}

/// Unbounded FIFO queue of pending messages for one actor.
///
/// Any actor may push; only the scheduler pops, and only while it holds the
/// owning actor's execution slot. Sequence numbers are assigned under the same
/// lock as the channel send, so they match delivery order.
pub struct Mailbox {
    owner: ActorId,
    /// The sending half of the channel
    sender: Sender<Message>,
    /// The receiving half of the channel
    receiver: Receiver<Message>,
    state: Mutex<MailboxState>,
}

impl Mailbox {
    pub fn new(owner: ActorId) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            owner,
            sender,
            receiver,
            state: Mutex::new(MailboxState {
                next_seq: 0,
                closed: false,
            }),
        }
    }

    /// Appends a message and returns its sequence number.
    pub fn push(
        &self,
        handler: &str,
        args: Vec<Value>,
        origin: MessageOrigin,
    ) -> Result<u64, MailboxError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(MailboxError::Closed);
        }
        let seq = state.next_seq;
        let message = Message {
            target: self.owner,
            handler: handler.to_string(),
            args,
            seq,
            origin,
        };
        self.sender.send(message).map_err(|_| MailboxError::Closed)?;
        state.next_seq += 1;
        Ok(seq)
    }

    /// Takes the oldest message, if any.
    pub fn try_pop(&self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// Refuses further pushes and discards everything still queued.
    ///
    /// Returns the number of discarded messages.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return 0;
        }
        state.closed = true;
        self.receiver.drain().count()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("owner", &self.owner)
            .field("len", &self.len())
            .finish()
    }
}
