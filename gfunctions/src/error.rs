//! Function registry errors and classifications.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionErrorKind {
    InvalidDefinition,
    Duplicate,
    NotFound,
    InvalidArguments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionError {
    pub kind: FunctionErrorKind,
    pub message: String,
    pub function_name: Option<String>,
}

impl FunctionError {
    pub fn new(kind: FunctionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            function_name: None,
        }
    }

    pub fn invalid_definition(message: impl Into<String>) -> Self {
        Self::new(FunctionErrorKind::InvalidDefinition, message)
    }

    pub fn duplicate(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            FunctionErrorKind::Duplicate,
            format!("function '{name}' is already registered"),
        )
        .with_function_name(name)
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            FunctionErrorKind::NotFound,
            format!("function '{name}' is not registered"),
        )
        .with_function_name(name)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(FunctionErrorKind::InvalidArguments, message)
    }

    pub fn with_function_name(mut self, function_name: impl Into<String>) -> Self {
        self.function_name = Some(function_name.into());
        self
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            FunctionErrorKind::InvalidArguments | FunctionErrorKind::NotFound
        )
    }
}

impl Display for FunctionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.function_name {
            Some(function_name) => write!(
                f,
                "{:?} [function={}]: {}",
                self.kind, function_name, self.message
            ),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for FunctionError {}
