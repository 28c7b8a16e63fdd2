use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::runtime::error::SystemError;
use crate::runtime::scheduler::worker::Worker;
use crate::runtime::scheduler::Scheduler;
use crate::runtime::system::RuntimeCore;

/// Pool of tokio worker tasks sharing one run queue.
///
/// Workers are started on the first `drive`, on the tokio runtime that
/// awaits it, so constructing a runtime needs no async context.
#[derive(Debug)]
pub struct SharedPoolScheduler {
    pool_size: usize,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SharedPoolScheduler {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    fn ensure_started(&self, core: &Arc<RuntimeCore>) -> Result<(), SystemError> {
        if self.started.load(Ordering::SeqCst) {
            return Ok(());
        }
        let handle = Handle::try_current()
            .map_err(|e| SystemError::ThreadSetupError(format!("no tokio runtime: {}", e)))?;

        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for id in 0..self.pool_size {
            let worker = Worker::new(id, core.clone());
            workers.push(handle.spawn(worker.run()));
        }
        info!(pool_size = self.pool_size, system = %core.system_id, "Shared pool started");
        Ok(())
    }
}

#[async_trait]
impl Scheduler for SharedPoolScheduler {
    fn name(&self) -> &'static str {
        "shared_pool"
    }

    async fn drive(&self, core: &Arc<RuntimeCore>) -> Result<(), SystemError> {
        self.ensure_started(core)?;
        core.wait_quiescent().await
    }

    async fn shutdown(&self, core: &Arc<RuntimeCore>) -> Result<(), SystemError> {
        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            workers.drain(..).collect()
        };
        if handles.is_empty() {
            return Ok(());
        }
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        match tokio::time::timeout(core.config.shutdown_timeout, join_all(handles)).await {
            Ok(results) => {
                let mut failures = results.into_iter().filter_map(Result::err);
                match failures.next() {
                    Some(first) => {
                        let panicked = 1 + failures.count();
                        warn!(panicked, "Workers ended abnormally");
                        Err(SystemError::Other(
                            anyhow::Error::new(first)
                                .context(format!("{} pool worker(s) ended abnormally", panicked)),
                        ))
                    }
                    None => Ok(()),
                }
            }
            Err(_) => {
                aborts.iter().for_each(|a| a.abort());
                Err(SystemError::ShutdownError(format!(
                    "workers did not stop within {:?}",
                    core.config.shutdown_timeout
                )))
            }
        }
    }
}
