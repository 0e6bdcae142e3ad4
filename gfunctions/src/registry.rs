//! Callable function registry keyed by function name.
//!
//! ```rust
//! use gfunctions::CallableFunctions;
//! use gprovider::FunctionDefinition;
//!
//! let mut functions = CallableFunctions::new();
//! functions
//!     .register(FunctionDefinition::new(
//!         "get_weather",
//!         serde_json::json!({"type": "object", "properties": {}}),
//!     ))
//!     .expect("definition should register");
//!
//! assert!(functions.contains("get_weather"));
//! assert!(functions.register(FunctionDefinition::new("get_weather", serde_json::json!({}))).is_err());
//! ```

use gcommon::Registry;
use gprovider::FunctionDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FunctionError;

const MAX_FUNCTION_NAME_LEN: usize = 64;

/// Definitions advertised to the completion service, in registration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<FunctionDefinition>",
    into = "Vec<FunctionDefinition>"
)]
pub struct CallableFunctions {
    functions: Registry<String, FunctionDefinition>,
}

impl CallableFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(
        definitions: impl IntoIterator<Item = FunctionDefinition>,
    ) -> Result<Self, FunctionError> {
        let mut functions = Self::new();
        for definition in definitions {
            functions.register(definition)?;
        }
        Ok(functions)
    }

    pub fn register(&mut self, definition: FunctionDefinition) -> Result<(), FunctionError> {
        validate_definition(&definition)?;
        if self.functions.contains_key(definition.name.as_str()) {
            return Err(FunctionError::duplicate(definition.name));
        }

        self.functions.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    /// Like [`get`](Self::get), but reports unknown names as an error.
    pub fn require(&self, name: &str) -> Result<&FunctionDefinition, FunctionError> {
        self.get(name).ok_or_else(|| FunctionError::not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FunctionDefinition> {
        self.functions.remove(name)
    }

    pub fn definitions(&self) -> Vec<FunctionDefinition> {
        self.functions.values().cloned().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl TryFrom<Vec<FunctionDefinition>> for CallableFunctions {
    type Error = FunctionError;

    fn try_from(value: Vec<FunctionDefinition>) -> Result<Self, Self::Error> {
        Self::from_definitions(value)
    }
}

impl From<CallableFunctions> for Vec<FunctionDefinition> {
    fn from(value: CallableFunctions) -> Self {
        value.definitions()
    }
}

pub fn validate_definition(definition: &FunctionDefinition) -> Result<(), FunctionError> {
    let name = definition.name.as_str();
    let valid_name = !name.is_empty()
        && name.len() <= MAX_FUNCTION_NAME_LEN
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');

    if !valid_name {
        return Err(FunctionError::invalid_definition(format!(
            "function name must match [A-Za-z0-9_-]{{1,{MAX_FUNCTION_NAME_LEN}}}"
        ))
        .with_function_name(name));
    }

    if !matches!(definition.parameters, Value::Object(_)) {
        return Err(
            FunctionError::invalid_definition("function parameters must be a JSON object")
                .with_function_name(name),
        );
    }

    Ok(())
}
