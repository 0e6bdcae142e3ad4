//! OpenAI transport trait and reqwest-based HTTP implementation.

use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use gcommon::RequestOptions;
use reqwest::{Client, RequestBuilder, Response};

use crate::{ProviderError, ProviderFuture};

use super::serde_api::{
    OpenAiApiModerationRequest, OpenAiApiModerationResponse, OpenAiApiResponse,
    OpenAiApiStreamResponse, build_api_request, extract_error_message, parse_finish_reason,
};
use super::types::{
    OpenAiAuth, OpenAiModerationRequest, OpenAiModerationResponse, OpenAiRequest, OpenAiResponse,
    OpenAiStreamChunk,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub type OpenAiChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<OpenAiStreamChunk, ProviderError>> + Send + 'a>>;

pub trait OpenAiTransport: Send + Sync + std::fmt::Debug {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>>;

    fn moderate<'a>(
        &'a self,
        request: OpenAiModerationRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiModerationResponse, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    client: Client,
    base_url: String,
}

impl OpenAiHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str, options: &RequestOptions) -> String {
        let base = options.base_url.as_deref().unwrap_or(&self.base_url);
        format!("{}/{}", base.trim_end_matches('/'), path)
    }

    fn prepare(
        &self,
        path: &str,
        auth: &OpenAiAuth,
        options: &RequestOptions,
    ) -> RequestBuilder {
        let mut builder = self.client.post(self.endpoint(path, options));
        builder = match auth {
            OpenAiAuth::ApiKey(key) => builder.bearer_auth(key.expose()),
        };

        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(timeout_ms) = options.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        builder
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ProviderError> {
        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                ProviderError::timeout(err.to_string())
            } else {
                ProviderError::transport(err.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        Ok(response)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("OpenAI request failed with status {status}"));

        ProviderError::from_status(status.as_u16(), message)
    }
}

impl OpenAiTransport for OpenAiHttpTransport {
    fn complete<'a>(
        &'a self,
        mut request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            request.stream = false;
            let options = std::mem::take(&mut request.request_options);
            let api_request = build_api_request(request)?;
            let builder = self
                .prepare("chat/completions", &auth, &options)
                .json(&api_request);
            let response = Self::send(builder).await?;

            let parsed: OpenAiApiResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::transport(err.to_string()))?;

            OpenAiResponse::try_from(parsed)
        })
    }

    fn stream<'a>(
        &'a self,
        mut request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.stream = true;
            let options = std::mem::take(&mut request.request_options);
            let api_request = build_api_request(request)?;
            let builder = self
                .prepare("chat/completions", &auth, &options)
                .json(&api_request);
            let response = Self::send(builder).await?;

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut buffer: Vec<u8> = Vec::new();
                let mut finished = false;

                while let Some(item) = chunks.next().await {
                    let bytes = item.map_err(|err| ProviderError::transport(err.to_string()))?;
                    buffer.extend_from_slice(&bytes);

                    for line in drain_sse_lines(&mut buffer)? {
                        let Some(payload) = sse_data(&line) else {
                            continue;
                        };

                        if payload == "[DONE]" {
                            finished = true;
                            break;
                        }

                        for chunk in parse_stream_payload(payload)? {
                            yield chunk;
                        }
                    }

                    if finished {
                        break;
                    }
                }
            };

            Ok(Box::pin(stream) as OpenAiChunkStream<'a>)
        })
    }

    fn moderate<'a>(
        &'a self,
        request: OpenAiModerationRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiModerationResponse, ProviderError>> {
        Box::pin(async move {
            let builder = self
                .prepare("moderations", &auth, &request.request_options)
                .json(&OpenAiApiModerationRequest {
                    input: request.input,
                });
            let response = Self::send(builder).await?;

            let parsed: OpenAiApiModerationResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::transport(err.to_string()))?;

            Ok(parsed.into())
        })
    }
}

/// Removes every complete line from `buffer`, leaving a trailing partial line.
///
/// Splitting happens on raw bytes so multi-byte characters split across
/// network chunks are decoded only once the whole line has arrived.
pub(crate) fn drain_sse_lines(buffer: &mut Vec<u8>) -> Result<Vec<String>, ProviderError> {
    let mut lines = Vec::new();
    while let Some(newline_index) = buffer.iter().position(|byte| *byte == b'\n') {
        let line = buffer.drain(..=newline_index).collect::<Vec<u8>>();
        let line =
            String::from_utf8(line).map_err(|err| ProviderError::transport(err.to_string()))?;
        lines.push(line.trim().to_string());
    }

    Ok(lines)
}

pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

pub(crate) fn parse_stream_payload(payload: &str) -> Result<Vec<OpenAiStreamChunk>, ProviderError> {
    let parsed: OpenAiApiStreamResponse =
        serde_json::from_str(payload).map_err(|err| ProviderError::transport(err.to_string()))?;

    let mut chunks = Vec::new();
    let Some(choice) = parsed.choices.into_iter().next() else {
        return Ok(chunks);
    };

    if let Some(content) = choice.delta.content
        && !content.is_empty()
    {
        chunks.push(OpenAiStreamChunk::ContentDelta(content));
    }

    if let Some(function_call) = choice.delta.function_call {
        chunks.push(OpenAiStreamChunk::FunctionCallDelta {
            name: function_call.name,
            arguments: function_call.arguments.unwrap_or_default(),
        });
    }

    if choice.finish_reason.is_some() {
        chunks.push(OpenAiStreamChunk::Finished(parse_finish_reason(
            choice.finish_reason.as_deref(),
        )));
    }

    Ok(chunks)
}
