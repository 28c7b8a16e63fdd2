use std::time::Duration;

use ascript_api::supervisor::SupervisionPolicy;

use crate::runtime::error::SystemError;

/// Determines where handler invocations run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchedulingMode {
    /// A pool of tokio worker tasks; handlers of different actors run in parallel.
    SharedPool {
        /// Number of worker tasks.
        pool_size: usize,
    },
    /// All handlers run on the task that drives the runtime.
    CurrentThread,
}

/// Configuration for an `ActorRuntime`.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// How handler invocations are scheduled.
    pub scheduling_mode: SchedulingMode,

    /// Max messages one actor processes in a single scheduling run before
    /// it is requeued behind other runnable actors.
    pub max_messages_per_run: usize,

    /// Supervision defaults; definitions may override single fields.
    pub supervision: SupervisionPolicy,

    /// Report failures of parentless actors that were not spawned as
    /// monitored roots from `run_until_quiescent` as well.
    pub surface_unsupervised_failures: bool,

    /// Turn a panicking handler into a failure of its actor instead of
    /// unwinding through the worker.
    pub catch_handler_panics: bool,

    /// How long `shutdown` waits for the workers to exit.
    pub shutdown_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scheduling_mode: SchedulingMode::SharedPool {
                pool_size: num_cpus::get(),
            },
            max_messages_per_run: 10,
            supervision: SupervisionPolicy::default(),
            surface_unsupervised_failures: false,
            catch_handler_panics: true,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl RuntimeConfig {
    /// Single-threaded configuration, mostly useful for deterministic tests.
    pub fn current_thread() -> Self {
        Self {
            scheduling_mode: SchedulingMode::CurrentThread,
            ..Self::default()
        }
    }

    pub fn shared_pool(pool_size: usize) -> Self {
        Self {
            scheduling_mode: SchedulingMode::SharedPool { pool_size },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SystemError> {
        if self.max_messages_per_run == 0 {
            return Err(SystemError::ConfigError(
                "max_messages_per_run must be at least 1".to_string(),
            ));
        }
        if let SchedulingMode::SharedPool { pool_size: 0 } = self.scheduling_mode {
            return Err(SystemError::ConfigError(
                "pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
