//! Function result encoding.

use serde_json::Value;

/// Encodes a function result as message content.
///
/// Strings pass through unchanged; every other value is JSON encoded.
pub fn stringify_function_result(result: &Value) -> String {
    match result {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
