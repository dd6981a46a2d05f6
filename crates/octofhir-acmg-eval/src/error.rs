//! Evaluation errors for the ACMG engine

use octofhir_acmg_diagnostics::{ACMG0105, ACMG0200, ACMG0202, ACMG0203, ACMG0205, ErrorCode};
use octofhir_acmg_types::ValueError;
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while evaluating one expression.
///
/// None of these escape a criterion: the criterion evaluator turns them into a
/// `false` level result plus a diagnostic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// Operand types do not support the operator
    #[error("unsupported operand types for {operator}: {left} and {right}")]
    TypeMismatch {
        operator: String,
        left: String,
        right: String,
    },

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Arithmetic overflow
    #[error("arithmetic overflow in {operation}")]
    Overflow { operation: String },

    /// Undefined function reference
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },

    /// Wrong number or kind of arguments
    #[error("{function}: {message}")]
    InvalidArguments { function: String, message: String },

    /// Internal error (should not happen)
    #[error("internal evaluation error: {message}")]
    Internal { message: String },
}

impl EvalError {
    pub fn type_mismatch(operator: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::TypeMismatch {
            operator: operator.into(),
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction { name: name.into() }
    }

    pub fn invalid_arguments(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TypeMismatch { .. } => ACMG0202,
            Self::DivisionByZero => ACMG0203,
            Self::Overflow { .. } => ACMG0202,
            Self::UnknownFunction { .. } => ACMG0105,
            Self::InvalidArguments { .. } => ACMG0205,
            Self::Internal { .. } => ACMG0200,
        }
    }
}

impl From<ValueError> for EvalError {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::TypeMismatch { op, left, right } => Self::type_mismatch(op, left, right),
            ValueError::DivisionByZero => Self::DivisionByZero,
            ValueError::Overflow(op) => Self::Overflow {
                operation: op.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(EvalError::DivisionByZero.code(), ACMG0203);
        assert_eq!(EvalError::unknown_function("foo").code(), ACMG0105);
        assert_eq!(
            EvalError::from(ValueError::DivisionByZero),
            EvalError::DivisionByZero
        );
    }

    #[test]
    fn test_messages() {
        let err = EvalError::type_mismatch("<", "str", "int");
        assert_eq!(err.to_string(), "unsupported operand types for <: str and int");
    }
}
