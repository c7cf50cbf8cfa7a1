// File: src/interpreter/native_functions/io.rs
//
// I/O-related native functions

use crate::errors::Result;
use crate::interpreter::{Interpreter, Value};

/// Handle I/O-related function calls
/// Returns Some(result) if the function was handled, None if not recognized
pub fn handle(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<Result<Value>> {
    let result = match name {
        "print" => {
            for arg in args {
                interp.write_output(&arg.to_string());
            }
            Value::Null
        }
        _ => return None,
    };
    Some(Ok(result))
}
