use thiserror::Error;

use ascript_api::errors::ActorError;

/// Errors related to Mailbox operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("Mailbox is closed")]
    Closed,
}

/// Errors related to the runtime itself.
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("Thread setup error: {0}")]
    ThreadSetupError(String),
    #[error("Root actor {actor} failed: {error}")]
    RootActorFailed { actor: String, error: ActorError },
    #[error("Actor runtime is shutting down")]
    ShuttingDown,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed during shutdown: {0}")]
    ShutdownError(String),
    #[error(transparent)]
    Actor(#[from] ActorError),
    #[error("Internal runtime error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SystemError {
    /// The actor error behind this failure, if there is one.
    pub fn actor_error(&self) -> Option<&ActorError> {
        match self {
            SystemError::RootActorFailed { error, .. } => Some(error),
            SystemError::Actor(error) => Some(error),
            _ => None,
        }
    }
}
