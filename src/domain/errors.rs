//! Domain error types
//!
//! This module defines the error hierarchy for Veil. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Veil error type
///
/// This is the primary error type used throughout the library. A failed
/// anonymization pass is never rolled back: fields written before the error
/// keep their new values.
#[derive(Debug, Error)]
pub enum VeilError {
    /// A generated or fixed value does not fit the field's declared type
    #[error("Value or type don't match: {0}")]
    ValueMismatch(String),

    /// Unique generation ran out of attempts
    #[error("Maximum retries of {max_retries} reached without finding a unique value for '{pattern}'")]
    GenerationExhausted { pattern: String, max_retries: usize },

    /// The value generator has no pattern with this name
    #[error("Unknown generation pattern: {0}")]
    UnknownPattern(String),

    /// A generation argument is missing or has the wrong shape
    #[error("Invalid generator argument: {0}")]
    InvalidArgument(String),

    /// Expression parsing or evaluation errors
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// The entity rejected a read or write
    #[error("Entity error: {0}")]
    Entity(String),

    /// A notification listener failed
    #[error("Hook error: {0}")]
    Hook(String),

    /// The uniqueness registry is unusable
    #[error("Registry error: {0}")]
    Registry(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl VeilError {
    /// Shorthand for [`VeilError::ValueMismatch`]
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::ValueMismatch(message.into())
    }

    /// Whether this is a [`VeilError::ValueMismatch`]
    pub fn is_value_mismatch(&self) -> bool {
        matches!(self, Self::ValueMismatch(_))
    }
}

/// Expression language errors
///
/// Raised while compiling a `@=` fixed value or evaluating it against an
/// entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Input ended in the middle of an expression
    #[error("Unexpected end of expression")]
    UnexpectedEof,

    /// A token that cannot appear at this position
    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    /// A numeric literal that does not parse
    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    /// A variable that is not bound
    #[error("Variable \"{0}\" is not valid")]
    UnknownVariable(String),

    /// A method or function the evaluator does not know
    #[error("Unknown method or function: {0}")]
    UnknownMethod(String),

    /// An operand of the wrong type
    #[error("Type error: {0}")]
    Type(String),

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,
}

// Conversion from std::io::Error
impl From<std::io::Error> for VeilError {
    fn from(err: std::io::Error) -> Self {
        VeilError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VeilError {
    fn from(err: toml::de::Error) -> Self {
        VeilError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_mismatch_display() {
        let err = VeilError::mismatch("object");
        assert_eq!(err.to_string(), "Value or type don't match: object");
        assert!(err.is_value_mismatch());
    }

    #[test]
    fn test_generation_exhausted_display() {
        let err = VeilError::GenerationExhausted {
            pattern: "email".to_string(),
            max_retries: 3,
        };
        assert!(err.to_string().contains("email"));
        assert!(err.to_string().contains('3'));
        assert!(!err.is_value_mismatch());
    }

    #[test]
    fn test_expression_error_conversion() {
        let err: VeilError = ExpressionError::DivisionByZero.into();
        assert!(matches!(err, VeilError::Expression(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: VeilError = io_err.into();
        assert!(matches!(err, VeilError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: VeilError = toml_err.into();
        assert!(matches!(err, VeilError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_veil_error_implements_std_error() {
        let err = VeilError::Hook("listener failed".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
