use std::sync::Arc;

use crate::actor::Handler;
use crate::errors::ActorError;

// Type aliases for common types
pub type ActorResult<T> = Result<T, ActorError>;
pub type BoxedHandler = Arc<dyn Handler>;
