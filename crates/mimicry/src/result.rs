//! Result and error types for Mimicry.

use crate::surface::{Arity, SurfaceKind};
use thiserror::Error;

/// Result type for Mimicry operations
pub type MimicryResult<T> = Result<T, MimicryError>;

/// Errors that can occur in Mimicry
#[derive(Debug, Error)]
pub enum MimicryError {
    /// An operation that was never declared was invoked on a double
    #[error("{subject} has no {surface} operation `{operation}`")]
    UndeclaredOperation {
        /// Name of the double
        subject: String,
        /// Surface the call was made on
        surface: SurfaceKind,
        /// Operation that was invoked
        operation: String,
    },

    /// A declared operation was read with no override, stored state or default
    #[error("{subject}#{operation} was invoked but has not been prepared (no override, stored value or default)")]
    UnpreparedOperation {
        /// Name of the double
        subject: String,
        /// Operation that was invoked
        operation: String,
    },

    /// The argument count does not fit the declared arity
    #[error("{subject}#{operation} takes {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// Name of the double
        subject: String,
        /// Operation that was invoked
        operation: String,
        /// Declared arity
        expected: Arity,
        /// Number of arguments supplied
        actual: usize,
    },

    /// A computed behavior read an argument the call did not supply
    #[error("`{operation}` has no argument at position {index}")]
    MissingArgument {
        /// Operation being resolved
        operation: String,
        /// Requested position
        index: usize,
    },

    /// Failure raised from a user-supplied behavior or hook
    #[error("behavior for `{operation}` failed: {message}")]
    Behavior {
        /// Operation being resolved
        operation: String,
        /// Error message
        message: String,
    },

    /// An expectation about recorded invocations did not hold
    #[error("Expectation not met: {message}")]
    ExpectationNotMet {
        /// Rendered failure message
        message: String,
    },

    /// Surface manifest could not be interpreted
    #[error("Invalid surface manifest: {message}")]
    Manifest {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl MimicryError {
    /// Failure raised from inside a computed default or hook
    pub fn behavior(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Behavior {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Expectation failure carrying a rendered message
    pub fn expectation(message: impl Into<String>) -> Self {
        Self::ExpectationNotMet {
            message: message.into(),
        }
    }

    /// Whether this is an unmet expectation (as opposed to a resolution failure)
    #[must_use]
    pub const fn is_expectation_failure(&self) -> bool {
        matches!(self, Self::ExpectationNotMet { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undeclared_message_names_surface() {
        let err = MimicryError::UndeclaredOperation {
            subject: "User".to_string(),
            surface: SurfaceKind::Singleton,
            operation: "destroy_all".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "User has no singleton operation `destroy_all`"
        );
    }

    #[test]
    fn test_unprepared_message_names_operation_and_subject() {
        let err = MimicryError::UnpreparedOperation {
            subject: "User".to_string(),
            operation: "address".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("User#address"));
        assert!(msg.contains("not been prepared"));
    }

    #[test]
    fn test_arity_message() {
        let err = MimicryError::ArityMismatch {
            subject: "User".to_string(),
            operation: "find".to_string(),
            expected: Arity::exact(1),
            actual: 3,
        };
        assert_eq!(err.to_string(), "User#find takes 1 argument(s), got 3");
    }

    #[test]
    fn test_expectation_helpers() {
        let err = MimicryError::expectation("never told");
        assert!(err.is_expectation_failure());
        assert!(!MimicryError::behavior("find", "boom").is_expectation_failure());
    }
}
