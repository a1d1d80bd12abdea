//! Error types for matcher operations

use thiserror::Error;

/// Matcher compilation and evaluation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatcherError {
    /// The expression text is malformed
    #[error("matcher parse failed at {position}: {message}")]
    Parse { position: usize, message: String },

    /// An identifier has no binding
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// A call names a function that is not registered
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    /// An operator or function got operands of the wrong type
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A built-in or custom function failed
    #[error("function `{name}` failed: {message}")]
    Function { name: String, message: String },

    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Parameters shadow function names
    #[error("you can't use function names as parameter names: {0}")]
    NamesConflict(String),

    /// The matcher produced something other than a boolean or a number
    #[error("matcher result must be boolean or numeric, got {0}")]
    NonBooleanResult(String),
}

impl MatcherError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn function(name: &str, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for matcher operations
pub type Result<T> = std::result::Result<T, MatcherError>;
