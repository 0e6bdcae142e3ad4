//! OpenAI provider implementation over transport and shared models.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;

use crate::{
    BoxedEventStream, ChatProvider, CompletionRequest, CompletionResponse, ModerationProvider,
    ModerationRequest, ModerationResult, ProviderError, ProviderFuture, ProviderId, SecretString,
    StreamEvent,
};

use super::auth::resolve_openai_auth;
use super::transport::OpenAiTransport;
use super::types::{OpenAiModerationRequest, OpenAiRequest};

#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: Option<SecretString>,
    transport: Arc<dyn OpenAiTransport>,
    fallback_model: String,
}

impl OpenAiProvider {
    pub fn new(transport: Arc<dyn OpenAiTransport>) -> Self {
        Self {
            api_key: None,
            transport,
            fallback_model: "gpt-4o-mini".to_string(),
        }
    }

    /// Key used when a request does not carry its own credential.
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub(crate) fn build_openai_request(&self, request: CompletionRequest, stream: bool) -> OpenAiRequest {
        let mut openai_request = OpenAiRequest::from(request);
        if openai_request.model.trim().is_empty() {
            openai_request.model = self.fallback_model.clone();
        }
        openai_request.stream = stream;
        openai_request
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &self.api_key)
            .field("transport", &self.transport)
            .field("fallback_model", &self.fallback_model)
            .finish()
    }
}

impl ChatProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn complete<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ProviderFuture<'a, Result<CompletionResponse, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let auth = resolve_openai_auth(request.credential.as_ref(), self.api_key.as_ref())?;
            let openai_request = self.build_openai_request(request, false);
            let response = self.transport.complete(openai_request, auth).await?;
            Ok(response.into_completion_response())
        })
    }

    fn stream<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let auth = resolve_openai_auth(request.credential.as_ref(), self.api_key.as_ref())?;
            let openai_request = self.build_openai_request(request, true);
            let mut chunks = self.transport.stream(openai_request, auth).await?;

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    yield StreamEvent::from(chunk?);
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}

impl ModerationProvider for OpenAiProvider {
    fn moderate<'a>(
        &'a self,
        request: ModerationRequest,
    ) -> ProviderFuture<'a, Result<ModerationResult, ProviderError>> {
        Box::pin(async move {
            let auth = resolve_openai_auth(request.credential.as_ref(), self.api_key.as_ref())?;
            let response = self
                .transport
                .moderate(
                    OpenAiModerationRequest {
                        input: request.input,
                        request_options: request.request_options,
                    },
                    auth,
                )
                .await?;
            Ok(ModerationResult::from(response))
        })
    }
}
