// File: src/interpreter/control_flow.rs
//
// Control flow signals for early returns.
//
// The evaluator threads ControlFlow through the error channel of its Result,
// so a `return` deep inside nested blocks unwinds with `?` until the
// enclosing function call catches it.

use super::value::Value;
use crate::errors::{SelveError, SourceLocation};

/// Why evaluation of a statement stopped early
#[derive(Debug, Clone)]
pub(crate) enum ControlFlow {
    /// A real failure, propagated to the caller of the program
    Error(SelveError),
    /// `return` encountered, carrying its value up to the nearest call
    Return { value: Value, location: SourceLocation },
}

impl From<SelveError> for ControlFlow {
    fn from(err: SelveError) -> Self {
        ControlFlow::Error(err)
    }
}

impl ControlFlow {
    /// Converts a stray signal into an error. A `return` that reaches the top
    /// level was not inside any function.
    pub(crate) fn into_error(self) -> SelveError {
        match self {
            ControlFlow::Error(err) => err,
            ControlFlow::Return { location, .. } => SelveError::runtime_error(
                "Cannot return outside of a function",
                location,
            ),
        }
    }
}

/// Result type used inside the evaluator
pub(crate) type Flow<T> = std::result::Result<T, ControlFlow>;
