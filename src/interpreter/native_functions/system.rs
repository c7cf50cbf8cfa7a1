// File: src/interpreter/native_functions/system.rs
//
// System-related native functions (clock)

use super::expect_arity;
use crate::errors::Result;
use crate::interpreter::Value;

pub fn handle(name: &str, args: &[Value]) -> Option<Result<Value>> {
    let result = match name {
        // Unix time in milliseconds
        "time" => expect_arity(name, args, 0)
            .map(|()| Value::Number(chrono::Utc::now().timestamp_millis())),
        _ => return None,
    };
    Some(result)
}
