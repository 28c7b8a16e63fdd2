//! # Scheduler
//!
//! Drives handler execution for one runtime.
//!
//! ## Key Concepts
//! - Run queue: actors whose mailbox is non-empty and that are not executing
//! - Scheduling states: `Idle -> Runnable -> Executing -> Idle|Runnable`
//! - Budget: an actor handles at most `max_messages_per_run` messages before
//!   it is requeued behind the other runnable actors
//!
//! ## Implementations
//! - [`SharedPoolScheduler`]: tokio worker tasks pulling from the run queue;
//!   handlers of different actors run in parallel
//! - [`CurrentThreadScheduler`]: the driving task drains the run queue itself
//!
//! Both give the same guarantees: per-mailbox FIFO delivery and per-actor
//! mutual exclusion. The per-actor state machine lives in
//! [`ActorCell`](crate::runtime::cell::ActorCell) and the message dispatch in
//! `runtime::dispatch`.

pub mod current;
pub mod pool;
pub mod queue;
pub mod worker;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::runtime::config::SchedulingMode;
use crate::runtime::error::SystemError;
use crate::runtime::system::RuntimeCore;

pub use current::CurrentThreadScheduler;
pub use pool::SharedPoolScheduler;
pub use queue::RunQueue;

/// Common interface of the scheduling strategies.
#[async_trait]
pub(crate) trait Scheduler: fmt::Debug + Send + Sync {
    /// Name used in log events.
    fn name(&self) -> &'static str;

    /// Runs handlers until no message is in flight.
    async fn drive(&self, core: &Arc<RuntimeCore>) -> Result<(), SystemError>;

    /// Stops the scheduler's workers. `core` has already been told to shut down.
    async fn shutdown(&self, core: &Arc<RuntimeCore>) -> Result<(), SystemError>;
}

/// Creates the scheduler for a scheduling mode.
pub(crate) fn create_scheduler(mode: &SchedulingMode) -> Box<dyn Scheduler> {
    match mode {
        SchedulingMode::SharedPool { pool_size } => Box::new(SharedPoolScheduler::new(*pool_size)),
        SchedulingMode::CurrentThread => Box::new(CurrentThreadScheduler::new()),
    }
}
