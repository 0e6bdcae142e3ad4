//! Conversation facade: turn lifecycle, rollback, and persistence.
//!
//! ```rust
//! use gchat::{Conversation, Role, TurnOptions};
//!
//! let runtime = tokio::runtime::Runtime::new().expect("runtime should start");
//! runtime.block_on(async {
//!     let conversation = Conversation::builder()
//!         .system_message("You are terse.")
//!         .build()
//!         .await
//!         .expect("conversation should build");
//!
//!     // No API key: dry mode mirrors the prompt back.
//!     let reply = conversation
//!         .prompt("ping", TurnOptions::default())
//!         .await
//!         .expect("dry turn should succeed");
//!     assert_eq!(reply.role, Role::Assistant);
//!     assert_eq!(reply.content_str(), "ping");
//!     assert_eq!(conversation.len(), 3);
//! });
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use gcommon::{ConversationId, MessageId, RequestOptions};
use gfunctions::{CallableFunctions, stringify_function_result};
use gprovider::{ChatProvider, FunctionDefinition, ModerationProvider, Role};
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};

use crate::completion::CompletionContext;
use crate::{
    ChatCompletionService, ChatError, ConversationConfig, ConversationConfigOptions,
    ConversationEvent, ConversationHistory, ConversationJson, Message, ModerationGate, Plugin,
    PluginContext, PluginPipeline, TurnOptions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnKind {
    User,
    Function,
}

impl TurnKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Function => "function",
        }
    }
}

pub struct Conversation {
    id: ConversationId,
    config: ConversationConfig,
    request_options: RequestOptions,
    functions: CallableFunctions,
    history: ConversationHistory,
    pipeline: PluginPipeline,
    moderation: ModerationGate,
    completion: ChatCompletionService,
    turn: Mutex<()>,
}

impl Conversation {
    pub fn builder() -> ConversationBuilder {
        ConversationBuilder::new()
    }

    /// Seeds a builder from a persisted conversation.
    ///
    /// Plugins and providers are not persisted; attach them on the returned
    /// builder before calling `build`.
    pub fn from_json(json: Value) -> Result<ConversationBuilder, ChatError> {
        ConversationBuilder::from_json(json)
    }

    pub fn from_json_str(json: &str) -> Result<ConversationBuilder, ChatError> {
        Self::from_json(serde_json::from_str(json)?)
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }

    pub fn functions(&self) -> &CallableFunctions {
        &self.functions
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn messages(&self) -> Vec<Message> {
        self.history.messages()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.pipeline.names()
    }

    /// Receives every history change, including one update per streamed chunk.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.history.subscribe()
    }

    /// Sends `content` as a user message and returns the assistant reply.
    ///
    /// On failure after the user message is added, the user-prompt error
    /// hooks run, the message is removed, and the original error is returned.
    pub async fn prompt(
        &self,
        content: impl Into<String>,
        options: TurnOptions,
    ) -> Result<Message, ChatError> {
        let _turn = self.turn.lock().await;
        self.run_user_turn(content.into(), &options).await
    }

    /// Answers a function call with `result` and returns the assistant reply.
    ///
    /// `result` passes through the plugin transform chain first; strings are
    /// sent verbatim and any other value is JSON encoded.
    pub async fn function_prompt(
        &self,
        name: impl Into<String>,
        result: Value,
        options: TurnOptions,
    ) -> Result<Message, ChatError> {
        let _turn = self.turn.lock().await;
        let name = name.into();

        let transformed = self.pipeline.transform_function_result(result).await?;
        let content = stringify_function_result(&transformed);
        let message = self.history.add_function_message(content, name)?;
        tracing::debug!(
            phase = "conversation",
            event = "function_prompt",
            conversation_id = %self.id,
            message_id = %message.id,
            function = message.name.as_deref().unwrap_or_default()
        );

        let mut pending = PendingTurnGuard::new(&self.history, message.id.clone());
        let outcome = self.complete_turn(TurnKind::Function, &message, &options).await;
        let settled = self.settle(TurnKind::Function, &message, outcome).await;
        pending.disarm();
        settled
    }

    /// Regenerates from the user message at or before `target`.
    ///
    /// Everything from that user message to the end of history is removed,
    /// then its content (or `new_prompt`) is sent as a fresh turn.
    pub async fn reprompt(
        &self,
        target: &MessageId,
        new_prompt: Option<String>,
        options: TurnOptions,
    ) -> Result<Message, ChatError> {
        let _turn = self.turn.lock().await;

        let messages = self.history.messages();
        let target_index = messages
            .iter()
            .position(|message| &message.id == target)
            .ok_or_else(|| ChatError::not_found(format!("message '{target}' does not exist")))?;

        let user_index = messages[..=target_index]
            .iter()
            .rposition(|message| message.role == Role::User)
            .ok_or_else(|| {
                ChatError::not_found(format!("no user message precedes message '{target}'"))
            })?;

        let content = new_prompt
            .unwrap_or_else(|| messages[user_index].content_str().to_string());

        for message in &messages[user_index..] {
            self.history.remove_message(&message.id)?;
        }

        tracing::debug!(
            phase = "conversation",
            event = "reprompt",
            conversation_id = %self.id,
            removed = messages.len() - user_index
        );
        self.run_user_turn(content, &options).await
    }

    /// Completes the current history without moderation and without adding
    /// the reply to history.
    pub async fn get_chat_completion_response(
        &self,
        options: TurnOptions,
    ) -> Result<Message, ChatError> {
        self.completion
            .get_chat_completion_response(self.completion_context(), &options)
            .await
    }

    pub async fn to_json(&self) -> Result<Value, ChatError> {
        let snapshot = ConversationJson {
            id: self.id.clone(),
            config: self.config.clone(),
            request_options: self.request_options.clone(),
            callable_functions: self.functions.clone(),
            history: self.history.messages(),
            plugins_data: self.pipeline.plugins_data(),
        };

        let json = serde_json::to_value(&snapshot)?;
        let transformed = self.pipeline.transform_conversation_json(json).await?;
        ConversationJson::parse(transformed.clone())?;
        Ok(transformed)
    }

    pub async fn to_json_string(&self) -> Result<String, ChatError> {
        let json = self.to_json().await?;
        Ok(serde_json::to_string(&json)?)
    }

    async fn run_user_turn(
        &self,
        content: String,
        options: &TurnOptions,
    ) -> Result<Message, ChatError> {
        let message = self.history.add_user_message(content)?;
        tracing::debug!(
            phase = "conversation",
            event = "user_prompt",
            conversation_id = %self.id,
            message_id = %message.id
        );

        let mut pending = PendingTurnGuard::new(&self.history, message.id.clone());
        let outcome = self.complete_turn(TurnKind::User, &message, options).await;
        let settled = self.settle(TurnKind::User, &message, outcome).await;
        pending.disarm();
        settled
    }

    async fn complete_turn(
        &self,
        kind: TurnKind,
        message: &Message,
        options: &TurnOptions,
    ) -> Result<Message, ChatError> {
        match kind {
            TurnKind::User => self.pipeline.on_user_prompt(message).await?,
            TurnKind::Function => self.pipeline.on_function_prompt(message).await?,
        }

        let request_options = self.request_options.merged_with(&options.request);
        self.moderation
            .moderate_message(&self.config, &request_options, &self.history, message)
            .await?;

        self.completion
            .get_assistant_response(self.completion_context(), options)
            .await
    }

    async fn settle(
        &self,
        kind: TurnKind,
        message: &Message,
        outcome: Result<Message, ChatError>,
    ) -> Result<Message, ChatError> {
        let error = match outcome {
            Ok(reply) => {
                tracing::info!(
                    phase = "conversation",
                    event = "turn_complete",
                    conversation_id = %self.id,
                    turn = kind.as_str(),
                    reply_id = %reply.id
                );
                return Ok(reply);
            }
            Err(error) => error,
        };

        let hook_result = match kind {
            TurnKind::User => self.pipeline.on_user_prompt_error(&error).await,
            TurnKind::Function => self.pipeline.on_function_prompt_error(&error).await,
        };
        if let Err(hook_error) = hook_result {
            tracing::warn!(
                phase = "plugin",
                event = "error_hook_failed",
                conversation_id = %self.id,
                turn = kind.as_str(),
                error = %hook_error
            );
        }

        if let Err(remove_error) = self.history.remove_message(&message.id) {
            tracing::warn!(
                phase = "conversation",
                event = "rollback_failed",
                conversation_id = %self.id,
                error = %remove_error
            );
        }

        tracing::warn!(
            phase = "conversation",
            event = "rollback",
            conversation_id = %self.id,
            turn = kind.as_str(),
            message_id = %message.id,
            error_kind = ?error.kind,
            error = %error
        );
        Err(error)
    }

    fn completion_context(&self) -> CompletionContext<'_> {
        CompletionContext {
            config: &self.config,
            request_options: &self.request_options,
            functions: &self.functions,
            history: &self.history,
        }
    }
}

/// Removes a turn's prompt message when the turn future is dropped before it
/// settles.
///
/// The message is only removed while it is still the last entry; a partial
/// assistant reply left behind by an abandoned stream keeps its prompt.
struct PendingTurnGuard<'a> {
    history: &'a ConversationHistory,
    id: MessageId,
    armed: bool,
}

impl<'a> PendingTurnGuard<'a> {
    fn new(history: &'a ConversationHistory, id: MessageId) -> Self {
        Self {
            history,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingTurnGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let is_last = self
            .history
            .messages()
            .last()
            .is_some_and(|message| message.id == self.id);
        if !is_last {
            return;
        }

        tracing::warn!(
            phase = "conversation",
            event = "turn_abandoned",
            message_id = %self.id
        );
        let _ = self.history.remove_message(&self.id);
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("messages", &self.history.len())
            .field("plugins", &self.pipeline.names())
            .field("moderation", &self.moderation)
            .field("completion", &self.completion)
            .finish()
    }
}

pub struct ConversationBuilder {
    id: Option<ConversationId>,
    config: ConversationConfigOptions,
    request_options: RequestOptions,
    functions: Vec<FunctionDefinition>,
    history: Vec<Message>,
    system_message: Option<String>,
    plugins: Vec<Plugin>,
    plugins_data: BTreeMap<String, Value>,
    include_default_plugins: bool,
    chat_provider: Option<Arc<dyn ChatProvider>>,
    moderation_provider: Option<Arc<dyn ModerationProvider>>,
}

impl std::fmt::Debug for ConversationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationBuilder")
            .field("id", &self.id)
            .field("messages", &self.history.len())
            .field("plugins", &self.plugins.len())
            .field("include_default_plugins", &self.include_default_plugins)
            .finish_non_exhaustive()
    }
}

impl Default for ConversationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            config: ConversationConfigOptions::default(),
            request_options: RequestOptions::default(),
            functions: Vec::new(),
            history: Vec::new(),
            system_message: None,
            plugins: Vec::new(),
            plugins_data: BTreeMap::new(),
            include_default_plugins: true,
            chat_provider: None,
            moderation_provider: None,
        }
    }

    pub fn from_json(json: Value) -> Result<Self, ChatError> {
        let persisted = ConversationJson::parse(json)?;
        let mut builder = Self::new()
            .id(persisted.id)
            .config(persisted.config.into())
            .request_options(persisted.request_options)
            .functions(persisted.callable_functions.definitions())
            .plugins_data(persisted.plugins_data);
        builder.history = persisted.history;
        Ok(builder)
    }

    pub fn id(mut self, id: impl Into<ConversationId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn config(mut self, config: ConversationConfigOptions) -> Self {
        self.config = config;
        self
    }

    pub fn request_options(mut self, request_options: RequestOptions) -> Self {
        self.request_options = request_options;
        self
    }

    pub fn function(mut self, definition: FunctionDefinition) -> Self {
        self.functions.push(definition);
        self
    }

    pub fn functions(mut self, definitions: Vec<FunctionDefinition>) -> Self {
        self.functions.extend(definitions);
        self
    }

    /// Sets the single system message kept at index 0.
    pub fn system_message(mut self, content: impl Into<String>) -> Self {
        self.system_message = Some(content.into());
        self
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn plugins(mut self, plugins: Vec<Plugin>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    pub fn plugins_data(mut self, plugins_data: BTreeMap<String, Value>) -> Self {
        self.plugins_data = plugins_data;
        self
    }

    /// Skips the process-wide default plugins for this conversation.
    pub fn without_default_plugins(mut self) -> Self {
        self.include_default_plugins = false;
        self
    }

    pub fn chat_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.chat_provider = Some(provider);
        self
    }

    pub fn moderation_provider(mut self, provider: Arc<dyn ModerationProvider>) -> Self {
        self.moderation_provider = Some(provider);
        self
    }

    /// Uses one collaborator for both completion and moderation.
    pub fn provider<P>(self, provider: Arc<P>) -> Self
    where
        P: ChatProvider + ModerationProvider + 'static,
    {
        self.chat_provider(provider.clone())
            .moderation_provider(provider)
    }

    /// Validates the parts, then runs every plugin's `on_init`.
    pub async fn build(self) -> Result<Conversation, ChatError> {
        let id = self.id.unwrap_or_else(ConversationId::generate);
        if id.is_blank() {
            return Err(ChatError::validation("conversation id must not be blank"));
        }

        let config = ConversationConfig::resolve(self.config);
        let functions = CallableFunctions::from_definitions(self.functions)?;
        let history = ConversationHistory::from_messages(self.history)?;
        if let Some(system_message) = self.system_message {
            history.set_system_message(system_message)?;
        }

        let pipeline = if self.include_default_plugins {
            PluginPipeline::with_defaults(self.plugins)?
        } else {
            PluginPipeline::new(self.plugins)?
        };

        let context = PluginContext {
            conversation_id: id.clone(),
            config: config.clone(),
        };
        pipeline.on_init(&context, &self.plugins_data).await?;

        tracing::info!(
            phase = "conversation",
            event = "created",
            conversation_id = %id,
            dry = config.dry,
            moderation = ?config.moderation,
            plugins = pipeline.len(),
            messages = history.len()
        );

        Ok(Conversation {
            id,
            config,
            request_options: self.request_options,
            functions,
            history,
            pipeline,
            moderation: ModerationGate::new(self.moderation_provider),
            completion: ChatCompletionService::new(self.chat_provider),
            turn: Mutex::new(()),
        })
    }
}
