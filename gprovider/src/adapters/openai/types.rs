//! OpenAI adapter types and provider-agnostic conversion logic.

use std::collections::BTreeSet;
use std::fmt::Formatter;

use gcommon::{GenerationOptions, RequestOptions};

use crate::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, FunctionDefinition,
    ModerationResult, SecretString, StreamEvent, TokenUsage,
};

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub functions: Vec<FunctionDefinition>,
    pub options: GenerationOptions,
    pub stream: bool,
    pub request_options: RequestOptions,
}

impl From<CompletionRequest> for OpenAiRequest {
    fn from(value: CompletionRequest) -> Self {
        Self {
            model: value.model,
            messages: value.messages,
            functions: value.functions,
            options: value.options,
            stream: value.stream,
            request_options: value.request_options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiResponse {
    pub model: String,
    pub message: ChatMessage,
    pub finish_reason: OpenAiFinishReason,
    pub usage: OpenAiUsage,
}

impl OpenAiResponse {
    pub(crate) fn into_completion_response(self) -> CompletionResponse {
        CompletionResponse {
            model: self.model,
            message: self.message,
            finish_reason: self.finish_reason.into(),
            usage: self.usage.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFinishReason {
    Stop,
    Length,
    FunctionCall,
    ContentFilter,
    Other,
}

impl From<OpenAiFinishReason> for FinishReason {
    fn from(value: OpenAiFinishReason) -> Self {
        match value {
            OpenAiFinishReason::Stop => Self::Stop,
            OpenAiFinishReason::Length => Self::Length,
            OpenAiFinishReason::FunctionCall => Self::FunctionCall,
            OpenAiFinishReason::ContentFilter => Self::ContentFilter,
            OpenAiFinishReason::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenAiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<OpenAiUsage> for TokenUsage {
    fn from(value: OpenAiUsage) -> Self {
        Self {
            input_tokens: value.prompt_tokens,
            output_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum OpenAiAuth {
    ApiKey(SecretString),
}

impl std::fmt::Debug for OpenAiAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("OpenAiAuth::ApiKey([REDACTED])"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAiStreamChunk {
    ContentDelta(String),
    FunctionCallDelta {
        name: Option<String>,
        arguments: String,
    },
    Finished(OpenAiFinishReason),
}

impl From<OpenAiStreamChunk> for StreamEvent {
    fn from(value: OpenAiStreamChunk) -> Self {
        match value {
            OpenAiStreamChunk::ContentDelta(delta) => Self::ContentDelta(delta),
            OpenAiStreamChunk::FunctionCallDelta { name, arguments } => {
                Self::FunctionCallDelta { name, arguments }
            }
            OpenAiStreamChunk::Finished(reason) => Self::Finished(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiModerationRequest {
    pub input: String,
    pub request_options: RequestOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenAiModerationResponse {
    pub flagged_categories: BTreeSet<String>,
}

impl From<OpenAiModerationResponse> for ModerationResult {
    fn from(value: OpenAiModerationResponse) -> Self {
        Self {
            categories: value.flagged_categories,
        }
    }
}
