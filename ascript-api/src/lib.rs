//! # AsyncScript Actor API
//!
//! The contract between the AsyncScript evaluator and the actor runtime.
//!
//! ## Key Concepts
//! - [`value`]: script values and their mutability (mutable / frozen / deep-frozen)
//! - [`actor`]: actor definitions with input handlers, output ports and binding declarations
//! - [`context`]: what a running handler body may ask of the runtime
//! - [`address`]: actor identities and references
//! - [`scope`]: the explicit root scope shared by all actors of one runtime
//!
//! ## Design Principles
//! - Isolation: only immutable values cross an actor boundary
//! - Opaque bodies: handler code is a callback, never interpreted here
//! - Runtime agnostic: no scheduling code lives in this crate

pub mod actor;
pub mod address;
pub mod context;
pub mod errors;
pub mod message;
pub mod scope;
pub mod supervisor;
pub mod types;
pub mod value;

pub use actor::{ActorDefinition, ActorDefinitionBuilder, BindingDecl, Handler, InputHandler, OutputPort, SourcePath};
pub use address::{ActorHandle, ActorId, ActorRef, ActorStatus};
pub use context::ActorContext;
pub use errors::ActorError;
pub use message::{Message, MessageOrigin, CHILD_STOPPED};
pub use scope::{RootScope, ScopeSnapshot};
pub use supervisor::{ChildTermination, SupervisionConfig, SupervisionPolicy, UnhandledChildStop};
pub use types::{ActorResult, BoxedHandler};
pub use value::{FunctionRef, Mutability, NodeId, Object, ObjectKind, Value};
