// File: src/interpreter/native_functions/mod.rs
//
// Native (built-in) function implementations, split by category.
// Each category exposes a `handle` that returns None for names it does not own.

pub mod io;
pub mod system;

use super::{Interpreter, Value};
use crate::errors::{Result, SelveError, SourceLocation};

/// Names bound as constants in the global scope at startup
pub const NATIVE_NAMES: &[&str] = &["print", "time"];

/// Main dispatcher that routes native function calls to their category module
pub fn call_native_function(interp: &mut Interpreter, name: &str, args: &[Value]) -> Result<Value> {
    if let Some(result) = io::handle(interp, name, args) {
        return result;
    }
    if let Some(result) = system::handle(name, args) {
        return result;
    }

    Err(SelveError::runtime_error(
        format!("Unknown native function: {}", name),
        SourceLocation::unknown(),
    ))
}

/// Arity check shared by natives that take a fixed number of arguments
pub(crate) fn expect_arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(SelveError::runtime_error(
            format!("Expected {} arguments but got {}", expected, args.len()),
            SourceLocation::unknown(),
        )
        .with_note(format!("{} takes {} arguments", name, expected)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn captured() -> (Interpreter, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let mut interpreter = Interpreter::new();
        interpreter.set_output(buffer.clone());
        (interpreter, buffer)
    }

    #[test]
    fn test_unknown_native_function_returns_explicit_error() {
        let mut interpreter = Interpreter::new();
        let err = call_native_function(&mut interpreter, "__unknown_native_test__", &[])
            .expect_err("unknown natives must fail");
        assert_eq!(err.message, "Unknown native function: __unknown_native_test__");
    }

    #[test]
    fn test_every_registered_native_dispatches() {
        let (mut interpreter, _) = captured();
        for name in NATIVE_NAMES {
            let result = call_native_function(&mut interpreter, name, &[]);
            assert!(result.is_ok(), "{} should dispatch, got {:?}", name, result);
        }
    }

    #[test]
    fn test_print_writes_each_argument_on_its_own_line() {
        let (mut interpreter, buffer) = captured();
        let result =
            call_native_function(&mut interpreter, "print", &[Value::Number(1), Value::Bool(true)])
                .unwrap();
        assert_eq!(result, Value::Null);
        let text = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "1\ntrue\n");
    }

    #[test]
    fn test_time_returns_milliseconds() {
        let mut interpreter = Interpreter::new();
        let before = chrono::Utc::now().timestamp_millis();
        let value = call_native_function(&mut interpreter, "time", &[]).unwrap();
        match value {
            Value::Number(ms) => assert!(ms >= before),
            other => panic!("Expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_time_rejects_arguments() {
        let mut interpreter = Interpreter::new();
        let err = call_native_function(&mut interpreter, "time", &[Value::Null]).unwrap_err();
        assert_eq!(err.message, "Expected 0 arguments but got 1");
    }
}
