//! Chat completion orchestration: request assembly, dry-mode synthesis, and
//! streamed response assembly into history.

use std::sync::Arc;

use futures_util::StreamExt;
use gcommon::{GenerationOptions, MessageId, RequestOptions};
use gfunctions::CallableFunctions;
use gprovider::{ChatProvider, CompletionRequest, FinishReason, StreamEvent};

use crate::{ChatError, ConversationConfig, ConversationHistory, Message};

/// Per-call overrides layered over the conversation's stored settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnOptions {
    pub generation: GenerationOptions,
    pub request: RequestOptions,
}

impl TurnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generation(mut self, generation: GenerationOptions) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.generation.stream = Some(stream);
        self
    }
}

/// Conversation state a completion call reads from.
#[derive(Clone, Copy)]
pub struct CompletionContext<'a> {
    pub config: &'a ConversationConfig,
    pub request_options: &'a RequestOptions,
    pub functions: &'a CallableFunctions,
    pub history: &'a ConversationHistory,
}

#[derive(Clone, Default)]
pub struct ChatCompletionService {
    provider: Option<Arc<dyn ChatProvider>>,
}

impl ChatCompletionService {
    pub fn new(provider: Option<Arc<dyn ChatProvider>>) -> Self {
        Self { provider }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Builds the wire request from the current history and merged options.
    pub fn build_request(
        &self,
        context: CompletionContext<'_>,
        options: &TurnOptions,
    ) -> Result<CompletionRequest, ChatError> {
        let generation = context.config.generation_options(&options.generation);
        let model = generation
            .model
            .clone()
            .unwrap_or_else(|| context.config.model.clone());
        let stream = generation.stream.unwrap_or(false);

        let request = CompletionRequest::builder(model)
            .messages(context.history.wire_snapshot()?)
            .functions(context.functions.definitions())
            .options(generation)
            .streaming(stream)
            .credential(context.config.api_key.clone())
            .request_options(context.request_options.merged_with(&options.request))
            .build()
            .map_err(|error| ChatError::validation(error.message))?;

        Ok(request)
    }

    /// Completes the current history without moderation and without
    /// touching history. Moderating the input is the caller's job.
    pub async fn get_chat_completion_response(
        &self,
        context: CompletionContext<'_>,
        options: &TurnOptions,
    ) -> Result<Message, ChatError> {
        if context.config.dry {
            return dry_response(context.history);
        }

        let provider = self.require_provider()?;
        let request = self.build_request(context, options)?;

        if !request.stream {
            let response = provider.complete(request).await?;
            return Ok(Message::from_completion(response.message));
        }

        let mut message = Message::streaming_assistant();
        let mut stream = provider.stream(request).await?;
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => apply_stream_event(&mut message, event),
                Err(error) => {
                    message.streaming = false;
                    return Err(ChatError::from(error).with_partial_message(message));
                }
            }
        }

        Ok(finalize(message))
    }

    /// Obtains the assistant reply and appends it to history.
    ///
    /// Streamed replies are appended immediately with `streaming = true` and
    /// updated after every chunk, in arrival order.
    pub async fn get_assistant_response(
        &self,
        context: CompletionContext<'_>,
        options: &TurnOptions,
    ) -> Result<Message, ChatError> {
        let history = context.history;

        if context.config.dry {
            tracing::debug!(phase = "completion", event = "dry_response");
            return history.add_assistant_message(dry_response(history)?);
        }

        let provider = self.require_provider()?;
        let request = self.build_request(context, options)?;
        tracing::debug!(
            phase = "completion",
            event = "request",
            model = request.model.as_str(),
            messages = request.messages.len(),
            stream = request.stream
        );

        if !request.stream {
            let response = provider.complete(request).await?;
            tracing::debug!(
                phase = "completion",
                event = "response",
                finish_reason = ?response.finish_reason,
                total_tokens = response.usage.total_tokens
            );
            return history.add_assistant_message(Message::from_completion(response.message));
        }

        let placeholder = history.add_assistant_message(Message::streaming_assistant())?;
        let mut guard = StreamingGuard::new(history, placeholder.id.clone());

        let mut stream = match provider.stream(request).await {
            Ok(stream) => stream,
            Err(error) => return Err(guard.abort(ChatError::from(error))),
        };

        let mut chunks = 0_usize;
        let mut finish_reason = None::<FinishReason>;
        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::Finished(reason)) => finish_reason = Some(reason),
                Ok(event) => {
                    chunks += 1;
                    let updated = history
                        .update_message(guard.id(), |message| apply_stream_event(message, event))?;
                    if updated.is_none() {
                        guard.disarm();
                        return Err(ChatError::not_found(
                            "streaming message was removed before the stream ended",
                        ));
                    }
                }
                Err(error) => return Err(guard.abort(ChatError::from(error))),
            }
        }

        tracing::debug!(
            phase = "completion",
            event = "stream_complete",
            chunks,
            finish_reason = ?finish_reason
        );
        guard.complete()
    }

    fn require_provider(&self) -> Result<&Arc<dyn ChatProvider>, ChatError> {
        self.provider.as_ref().ok_or_else(|| {
            ChatError::configuration("no completion provider is configured and dry mode is off")
        })
    }
}

impl std::fmt::Debug for ChatCompletionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionService")
            .field("provider", &self.provider.as_ref().map(|provider| provider.id()))
            .finish()
    }
}

/// Offline reply mirroring the content of the latest message.
fn dry_response(history: &ConversationHistory) -> Result<Message, ChatError> {
    let content = history
        .last_message()?
        .map(|message| message.content_str().to_string())
        .unwrap_or_default();
    Ok(Message::assistant(content))
}

fn apply_stream_event(message: &mut Message, event: StreamEvent) {
    match event {
        StreamEvent::ContentDelta(delta) => message.append_content(&delta),
        StreamEvent::FunctionCallDelta { name, arguments } => {
            message.append_function_call(name, &arguments)
        }
        StreamEvent::Finished(_) => {}
    }
}

fn finalize(mut message: Message) -> Message {
    message.streaming = false;
    if message.function_call.is_some() && message.content_str().is_empty() {
        message.content = None;
    }
    message
}

/// Finalizes an in-flight streamed message when the turn ends early.
///
/// Dropping an armed guard (the caller abandoned the turn) leaves the partial
/// message in history with `streaming = false`.
struct StreamingGuard<'a> {
    history: &'a ConversationHistory,
    id: MessageId,
    armed: bool,
}

impl<'a> StreamingGuard<'a> {
    fn new(history: &'a ConversationHistory, id: MessageId) -> Self {
        Self {
            history,
            id,
            armed: true,
        }
    }

    fn id(&self) -> &MessageId {
        &self.id
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn complete(mut self) -> Result<Message, ChatError> {
        self.disarm();
        let mut finalized = None;
        self.history.update_message(&self.id, |message| {
            *message = finalize(message.clone());
            finalized = Some(message.clone());
        })?;

        finalized.ok_or_else(|| ChatError::not_found("streaming message was removed"))
    }

    /// Removes the partial message and attaches it to `error`.
    fn abort(mut self, error: ChatError) -> ChatError {
        self.disarm();
        match self.history.remove_message(&self.id) {
            Ok(Some(partial)) => error.with_partial_message(finalize(partial)),
            Ok(None) => error,
            Err(lock_error) => {
                tracing::warn!(
                    phase = "completion",
                    event = "abort_cleanup_failed",
                    error = %lock_error
                );
                error
            }
        }
    }
}

impl Drop for StreamingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        tracing::warn!(
            phase = "completion",
            event = "stream_abandoned",
            message_id = %self.id
        );
        let _ = self.history.update_message(&self.id, |message| {
            message.streaming = false;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use gprovider::{
        BoxedEventStream, ChatMessage, CompletionResponse, ProviderError, ProviderFuture,
        ProviderId, Role, TokenUsage, VecEventStream,
    };

    use super::*;
    use crate::{ChatErrorKind, ConversationConfigOptions};

    #[derive(Debug)]
    struct ScriptedProvider {
        requests: Mutex<Vec<CompletionRequest>>,
        chunks: Vec<Result<StreamEvent, ProviderError>>,
    }

    impl ScriptedProvider {
        fn new(chunks: Vec<Result<StreamEvent, ProviderError>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                chunks,
            }
        }
    }

    impl ChatProvider for ScriptedProvider {
        fn id(&self) -> ProviderId {
            ProviderId::Custom("scripted")
        }

        fn complete<'a>(
            &'a self,
            request: CompletionRequest,
        ) -> ProviderFuture<'a, Result<CompletionResponse, ProviderError>> {
            Box::pin(async move {
                self.requests.lock().expect("requests lock").push(request.clone());
                Ok(CompletionResponse {
                    model: request.model,
                    message: ChatMessage::new(Role::Assistant, "complete reply"),
                    finish_reason: FinishReason::Stop,
                    usage: TokenUsage::default(),
                })
            })
        }

        fn stream<'a>(
            &'a self,
            request: CompletionRequest,
        ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
            Box::pin(async move {
                self.requests.lock().expect("requests lock").push(request);
                let stream = VecEventStream::new(self.chunks.clone());
                Ok(Box::pin(stream) as BoxedEventStream<'a>)
            })
        }
    }

    fn keyed_config(stream: bool) -> ConversationConfig {
        ConversationConfig::resolve(
            ConversationConfigOptions::default()
                .with_api_key("sk-test")
                .with_stream(stream),
        )
    }

    fn context<'a>(
        config: &'a ConversationConfig,
        request_options: &'a RequestOptions,
        functions: &'a CallableFunctions,
        history: &'a ConversationHistory,
    ) -> CompletionContext<'a> {
        CompletionContext {
            config,
            request_options,
            functions,
            history,
        }
    }

    #[tokio::test]
    async fn streamed_chunks_assemble_in_arrival_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(StreamEvent::ContentDelta("Hel".to_string())),
            Ok(StreamEvent::ContentDelta("lo".to_string())),
            Ok(StreamEvent::ContentDelta("!".to_string())),
            Ok(StreamEvent::Finished(FinishReason::Stop)),
        ]));
        let service = ChatCompletionService::new(Some(provider.clone()));
        let config = keyed_config(true);
        let request_options = RequestOptions::default();
        let functions = CallableFunctions::new();
        let history = ConversationHistory::new();
        history.add_user_message("hi").expect("user");

        let reply = service
            .get_assistant_response(
                context(&config, &request_options, &functions, &history),
                &TurnOptions::default(),
            )
            .await
            .expect("stream should succeed");

        assert_eq!(reply.content_str(), "Hello!");
        assert!(!reply.streaming);
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(history.messages()[1], reply);

        let requests = provider.requests.lock().expect("requests lock");
        assert!(requests[0].stream);
        assert_eq!(requests[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn stream_error_removes_partial_message_and_reports_it() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(StreamEvent::ContentDelta("partial".to_string())),
            Err(ProviderError::transport("connection reset")),
        ]));
        let service = ChatCompletionService::new(Some(provider));
        let config = keyed_config(true);
        let request_options = RequestOptions::default();
        let functions = CallableFunctions::new();
        let history = ConversationHistory::new();
        history.add_user_message("hi").expect("user");

        let error = service
            .get_assistant_response(
                context(&config, &request_options, &functions, &history),
                &TurnOptions::default(),
            )
            .await
            .expect_err("stream should fail");

        assert_eq!(error.kind, ChatErrorKind::Transport);
        let partial = error.partial_message.expect("partial message should be attached");
        assert_eq!(partial.content_str(), "partial");
        assert!(!partial.streaming);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn dry_mode_mirrors_latest_message_without_provider() {
        let service = ChatCompletionService::new(None);
        let config = ConversationConfig::default();
        let request_options = RequestOptions::default();
        let functions = CallableFunctions::new();
        let history = ConversationHistory::new();
        history.add_user_message("echo me").expect("user");

        let reply = service
            .get_assistant_response(
                context(&config, &request_options, &functions, &history),
                &TurnOptions::default(),
            )
            .await
            .expect("dry response");

        assert_eq!(reply.content_str(), "echo me");
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn per_call_options_override_stored_config() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let service = ChatCompletionService::new(Some(provider.clone()));
        let config = ConversationConfig::resolve(
            ConversationConfigOptions::default()
                .with_api_key("sk-test")
                .with_model("gpt-4o")
                .with_sampling(GenerationOptions::default().with_temperature(0.1)),
        );
        let request_options = RequestOptions::default().with_header("x-team", "core");
        let functions = CallableFunctions::new();
        let history = ConversationHistory::new();
        history.add_user_message("hi").expect("user");

        let reply = service
            .get_chat_completion_response(
                context(&config, &request_options, &functions, &history),
                &TurnOptions::default()
                    .with_generation(
                        GenerationOptions::default()
                            .with_model("gpt-4.1")
                            .with_temperature(0.7),
                    )
                    .with_request(RequestOptions::default().with_timeout_ms(500)),
            )
            .await
            .expect("completion");

        assert_eq!(reply.content_str(), "complete reply");
        assert_eq!(history.len(), 1);

        let requests = provider.requests.lock().expect("requests lock");
        let sent = &requests[0];
        assert_eq!(sent.model, "gpt-4.1");
        assert_eq!(sent.options.temperature, Some(0.7));
        assert_eq!(sent.credential.as_ref().map(|key| key.expose()), Some("sk-test"));
        assert_eq!(sent.request_options.timeout_ms, Some(500));
        assert_eq!(
            sent.request_options.headers.get("x-team").map(String::as_str),
            Some("core")
        );
    }

    #[tokio::test]
    async fn missing_provider_outside_dry_mode_is_a_configuration_error() {
        let service = ChatCompletionService::new(None);
        let config = keyed_config(false);
        let request_options = RequestOptions::default();
        let functions = CallableFunctions::new();
        let history = ConversationHistory::new();
        history.add_user_message("hi").expect("user");

        let error = service
            .get_assistant_response(
                context(&config, &request_options, &functions, &history),
                &TurnOptions::default(),
            )
            .await
            .expect_err("missing provider");
        assert_eq!(error.kind, ChatErrorKind::Configuration);
    }

    #[test]
    fn dropped_guard_finalizes_partial_message() {
        let history = ConversationHistory::new();
        let placeholder = history
            .add_assistant_message(Message::streaming_assistant())
            .expect("placeholder");
        history
            .update_message(&placeholder.id, |message| message.append_content("half"))
            .expect("update");

        drop(StreamingGuard::new(&history, placeholder.id.clone()));

        let stored = history
            .get_message(&placeholder.id)
            .expect("read")
            .expect("message kept");
        assert!(!stored.streaming);
        assert_eq!(stored.content_str(), "half");
    }
}
