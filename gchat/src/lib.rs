//! Conversation engine: ordered history, plugin hooks, moderation, and
//! streaming completions behind a single [`Conversation`] facade.

mod completion;
mod config;
mod conversation;
mod defaults;
mod error;
mod history;
mod json;
mod message;
mod moderation;
mod pipeline;
mod plugin;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, Conversation, ConversationBuilder, ConversationConfig,
        ConversationConfigOptions, ConversationEvent, ConversationHistory, Message,
        ModerationPolicy, Plugin, PluginContext, TurnOptions,
    };
    pub use gcommon::{ConversationId, GenerationOptions, MessageId, RequestOptions};
    pub use gfunctions::CallableFunctions;
    pub use gprovider::{FunctionCall, FunctionDefinition, Role};
}

pub use completion::{ChatCompletionService, CompletionContext, TurnOptions};
pub use config::{
    ConversationConfig, ConversationConfigOptions, DEFAULT_MODEL, ModerationPolicy,
};
pub use conversation::{Conversation, ConversationBuilder};
pub use defaults::{default_plugins, set_default_plugins};
pub use error::{ChatError, ChatErrorKind};
pub use history::{ConversationEvent, ConversationHistory};
pub use json::ConversationJson;
pub use message::Message;
pub use moderation::ModerationGate;
pub use pipeline::PluginPipeline;
pub use plugin::{Plugin, PluginBuilder, PluginContext, PluginFuture};

pub use gcommon::{ConversationId, GenerationOptions, MessageId, RequestOptions};
pub use gfunctions::{CallableFunctions, FunctionError};
pub use gprovider::{ChatMessage, FunctionCall, FunctionDefinition, Role};
