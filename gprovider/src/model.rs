//! Provider-agnostic request, response, and message model types.
//!
//! ```rust
//! use gprovider::{ChatMessage, CompletionRequest, ProviderErrorKind, Role};
//!
//! let ok = CompletionRequest::builder("gpt-4o-mini")
//!     .message(ChatMessage::new(Role::User, "Summarize this diff"))
//!     .build();
//! assert!(ok.is_ok());
//!
//! let err = CompletionRequest::builder("")
//!     .message(ChatMessage::new(Role::User, "hi"))
//!     .build()
//!     .err()
//!     .expect("empty model should fail");
//! assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
//! ```

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use gcommon::{GenerationOptions, RequestOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProviderError, SecretString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    Custom(&'static str),
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Wire shape of one history entry as the remote service expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
        }
    }

    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            content: Some(content.into()),
            name: Some(name.into()),
            function_call: None,
        }
    }

    pub fn with_function_call(mut self, function_call: FunctionCall) -> Self {
        self.function_call = Some(function_call);
        self
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// A callable function advertised to the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    FunctionCall,
    ContentFilter,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub model: String,
    pub message: ChatMessage,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
}

/// Fully resolved completion request handed to a [`ChatProvider`](crate::ChatProvider).
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub functions: Vec<FunctionDefinition>,
    pub options: GenerationOptions,
    pub stream: bool,
    pub credential: Option<SecretString>,
    pub request_options: RequestOptions,
}

impl CompletionRequest {
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model)
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::invalid_request("model must not be empty"));
        }

        if self.messages.is_empty() {
            return Err(ProviderError::invalid_request(
                "at least one message is required",
            ));
        }

        if self
            .messages
            .iter()
            .any(|message| message.role == Role::Function && message.name.is_none())
        {
            return Err(ProviderError::invalid_request(
                "function messages must carry a name",
            ));
        }

        if let Some(max_tokens) = self.options.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        if let Some(top_p) = self.options.top_p
            && !(0.0..=1.0).contains(&top_p)
        {
            return Err(ProviderError::invalid_request(
                "top_p must be in the inclusive range 0.0..=1.0",
            ));
        }

        for penalty in [self.options.frequency_penalty, self.options.presence_penalty]
            .into_iter()
            .flatten()
        {
            if !(-2.0..=2.0).contains(&penalty) {
                return Err(ProviderError::invalid_request(
                    "penalties must be in the inclusive range -2.0..=2.0",
                ));
            }
        }

        if let Some(stop) = &self.options.stop
            && stop.len() > 4
        {
            return Err(ProviderError::invalid_request(
                "at most four stop sequences are allowed",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequestBuilder {
    model: String,
    messages: Vec<ChatMessage>,
    functions: Vec<FunctionDefinition>,
    options: GenerationOptions,
    stream: bool,
    credential: Option<SecretString>,
    request_options: RequestOptions,
}

impl CompletionRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            functions: Vec::new(),
            options: GenerationOptions::default(),
            stream: false,
            credential: None,
            request_options: RequestOptions::default(),
        }
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn functions(mut self, functions: Vec<FunctionDefinition>) -> Self {
        self.functions = functions;
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn enable_streaming(self) -> Self {
        self.streaming(true)
    }

    pub fn credential(mut self, credential: Option<SecretString>) -> Self {
        self.credential = credential;
        self
    }

    pub fn request_options(mut self, request_options: RequestOptions) -> Self {
        self.request_options = request_options;
        self
    }

    pub fn build(self) -> Result<CompletionRequest, ProviderError> {
        let request = CompletionRequest {
            model: self.model,
            messages: self.messages,
            functions: self.functions,
            options: self.options,
            stream: self.stream,
            credential: self.credential,
            request_options: self.request_options,
        };

        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModerationRequest {
    pub input: String,
    pub credential: Option<SecretString>,
    pub request_options: RequestOptions,
}

impl ModerationRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_credential(mut self, credential: Option<SecretString>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_request_options(mut self, request_options: RequestOptions) -> Self {
        self.request_options = request_options;
        self
    }
}

/// Flagged category labels reported by the moderation service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModerationResult {
    pub categories: BTreeSet<String>,
}

impl ModerationResult {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn flagged(categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_flagged(&self) -> bool {
        !self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    fn request() -> CompletionRequestBuilder {
        CompletionRequest::builder("gpt-4o-mini").message(ChatMessage::new(Role::User, "hi"))
    }

    #[test]
    fn provider_id_display_is_stable() {
        assert_eq!(ProviderId::OpenAi.to_string(), "openai");
        assert_eq!(ProviderId::Custom("fake").to_string(), "fake");
    }

    #[test]
    fn completion_request_validate_enforces_contract() {
        let err = CompletionRequest::builder("gpt")
            .build()
            .expect_err("empty messages must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let err = request()
            .options(GenerationOptions::default().with_temperature(2.5))
            .build()
            .expect_err("temperature outside range must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let err = request()
            .options(GenerationOptions::default().with_top_p(1.5))
            .build()
            .expect_err("top_p outside range must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let err = request()
            .options(GenerationOptions::default().with_presence_penalty(-3.0))
            .build()
            .expect_err("penalty outside range must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let err = request()
            .options(GenerationOptions::default().with_stop(["a", "b", "c", "d", "e"]))
            .build()
            .expect_err("too many stop sequences must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let valid = request()
            .options(
                GenerationOptions::default()
                    .with_temperature(0.4)
                    .with_max_tokens(128),
            )
            .enable_streaming()
            .build()
            .expect("valid request should build");
        assert!(valid.stream);
    }

    #[test]
    fn function_messages_require_a_name() {
        let nameless = ChatMessage {
            role: Role::Function,
            content: Some("{}".to_string()),
            name: None,
            function_call: None,
        };

        let err = CompletionRequest::builder("gpt")
            .message(nameless)
            .build()
            .expect_err("nameless function message must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
    }

    #[test]
    fn chat_message_serializes_role_lowercase_and_skips_absent_fields() {
        let json = serde_json::to_value(ChatMessage::new(Role::Assistant, "ok"))
            .expect("message should serialize");
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "ok"}));
    }

    #[test]
    fn moderation_result_reports_flagged_state() {
        assert!(!ModerationResult::clean().is_flagged());
        assert!(ModerationResult::flagged(["hate"]).is_flagged());
    }
}
