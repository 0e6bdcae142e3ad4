//! JSON argument parsing helpers for assistant-issued function calls.
//!
//! ```rust
//! use gfunctions::{parse_json_object, required_string};
//!
//! let args = parse_json_object(r#"{"query":"rust"}"#).expect("object should parse");
//! let query = required_string(&args, "query").expect("query should be present");
//! assert_eq!(query, "rust");
//! ```

use serde_json::{Map, Value};

use crate::FunctionError;

pub fn parse_json_value(args_json: &str) -> Result<Value, FunctionError> {
    serde_json::from_str(args_json)
        .map_err(|err| FunctionError::invalid_arguments(format!("invalid JSON arguments: {err}")))
}

pub fn parse_json_object(args_json: &str) -> Result<Map<String, Value>, FunctionError> {
    match parse_json_value(args_json)? {
        Value::Object(map) => Ok(map),
        _ => Err(FunctionError::invalid_arguments(
            "expected JSON object arguments",
        )),
    }
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, FunctionError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            FunctionError::invalid_arguments(format!("missing required string: '{key}'"))
        })
}
