//! Conversation-layer errors and classification.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

use gfunctions::FunctionError;
use gprovider::ProviderError;

use crate::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    Validation,
    NotFound,
    Moderation,
    Transport,
    Plugin,
    Configuration,
}

impl ChatErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Moderation => "moderation",
            Self::Transport => "transport",
            Self::Plugin => "plugin",
            Self::Configuration => "configuration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    /// Categories that caused a strict-mode moderation rejection.
    pub flagged_categories: BTreeSet<String>,
    /// Original collaborator failure for `Transport` errors.
    pub provider_error: Option<ProviderError>,
    /// Content received before a streamed completion failed.
    pub partial_message: Option<Box<Message>>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            flagged_categories: BTreeSet::new(),
            provider_error: None,
            partial_message: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::NotFound, message)
    }

    pub fn moderation(categories: BTreeSet<String>) -> Self {
        let listed = categories.iter().cloned().collect::<Vec<_>>().join(", ");
        let mut error = Self::new(
            ChatErrorKind::Moderation,
            format!("message was flagged by moderation: {listed}"),
        );
        error.flagged_categories = categories;
        error
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Transport, message)
    }

    pub fn plugin(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Plugin, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Configuration, message)
    }

    pub fn with_partial_message(mut self, message: Message) -> Self {
        self.partial_message = Some(Box::new(message));
        self
    }

    pub fn is_moderation(&self) -> bool {
        self.kind == ChatErrorKind::Moderation
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.provider_error
            .as_ref()
            .map(|error| error as &(dyn Error + 'static))
    }
}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let mut error = ChatError::transport(value.to_string());
        error.provider_error = Some(value);
        error
    }
}

impl From<FunctionError> for ChatError {
    fn from(value: FunctionError) -> Self {
        ChatError::validation(value.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(value: serde_json::Error) -> Self {
        ChatError::validation(format!("invalid conversation JSON: {value}"))
    }
}
