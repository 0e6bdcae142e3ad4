//! Callable function definitions advertised to the completion service.
//!
//! Functions are declared, never executed here: the assistant may request a
//! call, and the caller answers with a result via a function prompt.

mod args;
mod error;
mod registry;
mod result;

pub mod prelude {
    pub use crate::{
        CallableFunctions, FunctionError, FunctionErrorKind, parse_json_object,
        parse_json_value, required_string, stringify_function_result,
    };
}

pub use args::{parse_json_object, parse_json_value, required_string};
pub use error::{FunctionError, FunctionErrorKind};
pub use registry::{CallableFunctions, validate_definition};
pub use result::stringify_function_result;
