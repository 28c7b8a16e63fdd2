use std::sync::Arc;

use async_trait::async_trait;

use crate::log_scheduler;
use crate::runtime::error::SystemError;
use crate::runtime::scheduler::Scheduler;
use crate::runtime::system::RuntimeCore;

/// Runs every handler on the task that awaits `run_until_quiescent`.
#[derive(Debug, Default)]
pub struct CurrentThreadScheduler;

/// Slices handled between cooperative yields to the tokio runtime.
const YIELD_EVERY: usize = 64;

impl CurrentThreadScheduler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scheduler for CurrentThreadScheduler {
    fn name(&self) -> &'static str {
        "current_thread"
    }

    async fn drive(&self, core: &Arc<RuntimeCore>) -> Result<(), SystemError> {
        let mut slices = 0usize;
        while let Some(cell) = core.run_queue.try_pop() {
            if core.is_shutting_down() {
                return Err(SystemError::ShuttingDown);
            }
            core.run_slice(cell);
            slices += 1;
            if slices % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }
        log_scheduler!(self.name(), "drained", slices = slices);
        Ok(())
    }

    async fn shutdown(&self, _core: &Arc<RuntimeCore>) -> Result<(), SystemError> {
        Ok(())
    }
}
