use thiserror::Error;

use crate::runtime::object::ObjectHolder;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Variable path is empty")]
    EmptyVariablePath,
    #[error("Unknown method '{method}' for class {class}")]
    UnknownMethod { method: String, class: String },
    #[error("Method '{method}' expected {expected} arguments, got {found}")]
    MethodArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("Operation '{operation}' is not supported for types {lhs} and {rhs}")]
    UnsupportedOperandTypes {
        operation: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Cannot compare values of types {lhs} and {rhs} for {relation}")]
    NotComparable {
        relation: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Method '{method}' returned a non-boolean result")]
    ComparisonNotBoolean { method: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Cannot assign field '{field}' to a value of type {type_name}")]
    FieldOnNonInstance {
        field: String,
        type_name: &'static str,
    },
    #[error("Return outside of a method body")]
    ReturnOutsideMethod,
    #[error("Writing to the output stream failed: {0}")]
    OutputStream(String),
}

impl From<std::io::Error> for RuntimeError {
    fn from(error: std::io::Error) -> Self {
        RuntimeError::OutputStream(error.to_string())
    }
}

/// Non-local exit raised while executing a statement.
///
/// `Return` is the control signal carrying the value of a `return` statement
/// up to the enclosing `MethodBody`; it is not an error. `Failure` is the
/// ordinary error channel. Keeping both in the `Err` side of [`ExecResult`]
/// lets every evaluator propagate with `?` while only `MethodBody` (and the
/// top-level runner) inspect the signal.
#[derive(Debug)]
pub enum Signal {
    Return(ObjectHolder),
    Failure(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Self {
        Signal::Failure(error)
    }
}

pub type ExecResult = Result<ObjectHolder, Signal>;
