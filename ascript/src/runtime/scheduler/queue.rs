use std::fmt;
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use tokio::sync::Notify;

use crate::runtime::cell::ActorCell;

/// Actors with queued messages, waiting for a worker.
///
/// An actor is pushed only on its Idle -> Runnable transition, so it appears
/// at most once. Workers pop in FIFO order, which gives round-robin fairness
/// between runnable actors.
pub struct RunQueue {
    /// Lock-free queue of runnable actors
    queue: SegQueue<Arc<ActorCell>>,
    /// Wakes one waiting worker per push
    notify: Notify,
}

impl RunQueue {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            notify: Notify::new(),
        }
    }

    pub fn push(&self, cell: Arc<ActorCell>) {
        self.queue.push(cell);
        self.notify.notify_one();
    }

    pub fn try_pop(&self) -> Option<Arc<ActorCell>> {
        self.queue.pop()
    }

    /// Waits until an actor is available.
    ///
    /// `notify_one` stores a permit when nobody is waiting, so a push that
    /// races with the empty check is not lost.
    pub async fn pop(&self) -> Arc<ActorCell> {
        loop {
            if let Some(cell) = self.try_pop() {
                return cell;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for RunQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunQueue").field("len", &self.len()).finish()
    }
}
