//! OpenAI HTTP payload serde models and conversion helpers.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, FunctionCall, FunctionDefinition, ProviderError, Role};

use super::types::{
    OpenAiFinishReason, OpenAiModerationResponse, OpenAiRequest, OpenAiResponse, OpenAiUsage,
};

pub(crate) fn build_api_request(request: OpenAiRequest) -> Result<OpenAiApiRequest, ProviderError> {
    if request.messages.is_empty() {
        return Err(ProviderError::invalid_request(
            "OpenAI request requires at least one message",
        ));
    }

    let functions = if request.functions.is_empty() {
        None
    } else {
        Some(request.functions)
    };

    let options = request.options;
    Ok(OpenAiApiRequest {
        model: request.model,
        messages: request.messages,
        functions,
        temperature: options.temperature,
        top_p: options.top_p,
        frequency_penalty: options.frequency_penalty,
        presence_penalty: options.presence_penalty,
        max_tokens: options.max_tokens,
        logit_bias: options.logit_bias,
        stop: options.stop,
        user: options.user,
        stream: request.stream,
    })
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> OpenAiFinishReason {
    match value {
        Some("stop") => OpenAiFinishReason::Stop,
        Some("length") => OpenAiFinishReason::Length,
        Some("function_call") => OpenAiFinishReason::FunctionCall,
        Some("content_filter") => OpenAiFinishReason::ContentFilter,
        _ => OpenAiFinishReason::Other,
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<OpenAiApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiErrorEnvelope {
    pub error: OpenAiApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiError {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiResponse {
    pub model: String,
    pub choices: Vec<OpenAiApiChoice>,
    pub usage: Option<OpenAiApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiChoice {
    pub message: OpenAiApiAssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiAssistantMessage {
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TryFrom<OpenAiApiResponse> for OpenAiResponse {
    type Error = ProviderError;

    fn try_from(value: OpenAiApiResponse) -> Result<Self, Self::Error> {
        let choice =
            value.choices.into_iter().next().ok_or_else(|| {
                ProviderError::transport("OpenAI response did not include choices")
            })?;

        let usage = value
            .usage
            .map(|usage| OpenAiUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })
            .unwrap_or_default();

        Ok(Self {
            model: value.model,
            message: ChatMessage {
                role: Role::Assistant,
                content: choice.message.content,
                name: None,
                function_call: choice.message.function_call,
            },
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamResponse {
    pub choices: Vec<OpenAiApiStreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamChoice {
    pub delta: OpenAiApiStreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamDelta {
    pub content: Option<String>,
    pub function_call: Option<OpenAiApiDeltaFunctionCall>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiDeltaFunctionCall {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiModerationRequest {
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiModerationResponse {
    pub results: Vec<OpenAiApiModerationOutcome>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiModerationOutcome {
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
}

impl From<OpenAiApiModerationResponse> for OpenAiModerationResponse {
    fn from(value: OpenAiApiModerationResponse) -> Self {
        let flagged_categories = value
            .results
            .into_iter()
            .flat_map(|outcome| outcome.categories)
            .filter_map(|(category, flagged)| flagged.then_some(category))
            .collect::<BTreeSet<_>>();

        Self { flagged_categories }
    }
}
