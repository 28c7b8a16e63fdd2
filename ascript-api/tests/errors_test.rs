use anyhow::Result as AnyhowResult;
use ascript_api::errors::ActorError;
use ascript_api::value::{Mutability, Value};
use std::error::Error;

#[cfg(test)]
mod tests {
    use super::*;

    // Test immutable write error
    #[test]
    fn test_immutable_write_error() {
        let error = ActorError::ImmutableWriteError {
            key: "x".to_string(),
            mutability: Mutability::Frozen,
        };

        assert_eq!(error.to_string(), "Cannot write 'x' on a frozen value");
        assert!(error.source().is_none());
        assert!(error.is_recoverable());
    }

    // Test unmatched handler error
    #[test]
    fn test_unmatched_handler_error() {
        let error = ActorError::UnmatchedHandlerError {
            actor: "Echo#2".to_string(),
            handler: "pong".to_string(),
        };

        assert_eq!(error.to_string(), "Actor Echo#2 has no input handler 'pong'");
        assert!(!error.is_recoverable());
    }

    // Thrown values pass through unchanged
    #[test]
    fn test_thrown_error_to_value() {
        let error = ActorError::Thrown(Value::from(42));
        assert_eq!(error.to_value(), Value::from(42));
        assert_eq!(error.to_string(), "Uncaught exception: 42");
    }

    // Other errors become their message
    #[test]
    fn test_error_to_value_is_message() {
        let error = ActorError::ConstructorError {
            actor: "Echo#2".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(
            error.to_value(),
            Value::from("Constructor of Echo#2 failed: boom")
        );
    }

    // Test conversion into anyhow
    #[test]
    fn test_anyhow_conversion() {
        fn fails() -> AnyhowResult<()> {
            Err(ActorError::DuplicateDefinitionError("Echo".to_string()))?;
            Ok(())
        }

        let error = fails().unwrap_err();
        assert_eq!(error.to_string(), "Duplicate definition: Echo");
        assert!(error.downcast_ref::<ActorError>().is_some());
    }
}
