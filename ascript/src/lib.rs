// AsyncScript Actor Runtime
//
// This crate runs the actors described by `ascript-api` definitions: every
// instance gets a mailbox, handlers run one message at a time per actor on a
// shared pool of tokio tasks (or on the driving task), and only deep-frozen
// values cross actor boundaries.

pub mod logging;
pub mod runtime;

// Re-export commonly used types
pub use runtime::{ActorRuntime, RuntimeConfig, SchedulingMode, SystemError};
pub use ascript_api;
