//! # Actor Error Types
//!
//! The error taxonomy shared by the evaluator and the runtime.
//!
//! ## Error Classes
//! - Recoverable language errors: [`ActorError::ImmutableWriteError`], [`ActorError::TypeError`],
//!   [`ActorError::Thrown`]. They surface to the offending handler as ordinary results.
//! - Construction errors: [`ActorError::BindingResolutionError`], [`ActorError::ConstructorError`],
//!   [`ActorError::UnknownDefinition`]. They abort one spawn and are returned to the spawning scope.
//! - Load-time errors: [`ActorError::DuplicateDefinitionError`].
//! - Delivery errors: [`ActorError::UnmatchedHandlerError`], which fails the target actor.
//!
//! Any error escaping a handler body turns the actor `Failed` and is reported to
//! its parent through `childStopped`.
//!
//! ## Usage Example
//!
//! ```rust
//! use ascript_api::errors::ActorError;
//!
//! fn describe(error: &ActorError) -> &'static str {
//!     match error {
//!         ActorError::ImmutableWriteError { .. } => "write on frozen value",
//!         ActorError::BindingResolutionError { .. } => "bad binding",
//!         _ => "other",
//!     }
//! }
//! ```

use thiserror::Error;

use crate::value::{Mutability, Value};

/// Core error type for the actor runtime and the values it manages.
///
/// The type is `Clone` because the same error is stored in the failed actor's
/// status and delivered to its parent.
#[derive(Error, Debug, Clone)]
pub enum ActorError {
    /// A write was attempted on a frozen or deep-frozen value.
    #[error("Cannot write '{key}' on a {mutability} value")]
    ImmutableWriteError { key: String, mutability: Mutability },

    /// A binding declaration could not be resolved while constructing an actor.
    ///
    /// # Parameters
    /// * `actor` - Path of the actor being constructed
    /// * `path` - The declaration, rendered as `input <- source.output`
    /// * `reason` - What went wrong
    #[error("Cannot resolve binding '{path}' of {actor}: {reason}")]
    BindingResolutionError { actor: String, path: String, reason: String },

    /// An actor definition with the same name is already registered.
    #[error("Duplicate definition: {0}")]
    DuplicateDefinitionError(String),

    /// A delivered message names an input the target does not define.
    #[error("Actor {actor} has no input handler '{handler}'")]
    UnmatchedHandlerError { actor: String, handler: String },

    /// The constructor body of an actor raised an error.
    #[error("Constructor of {actor} failed: {reason}")]
    ConstructorError { actor: String, reason: String },

    /// No actor definition is registered under this name.
    #[error("Unknown actor definition: {0}")]
    UnknownDefinition(String),

    /// An actor emitted through an output port it does not declare.
    #[error("Actor {actor} has no output port '{output}'")]
    UnknownOutput { actor: String, output: String },

    /// Operation applied to a value of the wrong type.
    #[error("Type error: {0}")]
    TypeError(String),

    /// A value thrown by script code.
    #[error("Uncaught exception: {0}")]
    Thrown(Value),

    /// A handler body panicked.
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// The addressed actor is no longer running.
    #[error("Actor stopped")]
    Stopped,

    /// The runtime is shutting down and refuses new work.
    #[error("Actor system is shutting down")]
    SystemShutdown,
}

impl ActorError {
    /// Converts the error into the script value delivered as the `error`
    /// argument of `childStopped`.
    ///
    /// Thrown values are passed through untouched; every other error becomes
    /// its message string.
    pub fn to_value(&self) -> Value {
        match self {
            ActorError::Thrown(value) => value.clone(),
            other => Value::from(other.to_string()),
        }
    }

    /// Whether a handler may catch this error and keep running.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ActorError::ImmutableWriteError { .. } | ActorError::TypeError(_) | ActorError::Thrown(_)
        )
    }
}
