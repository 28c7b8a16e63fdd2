use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::log_scheduler;
use crate::runtime::system::RuntimeCore;

/// # Pool Worker
///
/// One tokio task of the shared pool.
///
/// ## Core Algorithm
/// 1. Wait for a runnable actor on the run queue (or for shutdown)
/// 2. Run one slice of its mailbox, at most `max_messages_per_run` messages
/// 3. The slice requeues the actor if messages remain
/// 4. Yield to the tokio runtime and repeat
///
/// With `catch_handler_panics` set, handler panics are caught inside the
/// slice and a failing actor never takes its worker down.
pub(crate) struct Worker {
    id: usize,
    core: Arc<RuntimeCore>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker").field("id", &self.id).finish()
    }
}

impl Worker {
    pub(crate) fn new(id: usize, core: Arc<RuntimeCore>) -> Self {
        Self { id, core }
    }

    pub(crate) async fn run(self) {
        log_scheduler!("shared_pool", "worker_started", worker = self.id);
        loop {
            let cell = tokio::select! {
                biased;
                _ = self.core.shutdown_requested() => break,
                cell = self.core.run_queue.pop() => cell,
            };
            log_scheduler!("shared_pool", "picked", worker = self.id, actor = cell.path());
            self.core.run_slice(cell);
            tokio::task::yield_now().await;
        }
        debug!(worker = self.id, "Worker stopped");
    }
}
