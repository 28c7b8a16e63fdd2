#![doc = " Actor runtime for AsyncScript: mailboxes, bindings, scheduling and supervision."]

pub mod binding;
pub mod cell;
pub mod config;
mod context;
mod dispatch;
pub mod error;
pub mod mailbox;
pub mod registry;
pub mod scheduler;
mod supervisor;
pub mod system;

// Re-export key types for easier usage
pub use binding::{BindingTable, Subscription};
pub use cell::{ActorCell, SchedState};
pub use config::{RuntimeConfig, SchedulingMode};
pub use error::{MailboxError, SystemError};
pub use mailbox::Mailbox;
pub use registry::{ActorDirectory, DefinitionRegistry};
pub use system::ActorRuntime;
