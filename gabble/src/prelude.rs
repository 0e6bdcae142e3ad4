//! Common imports for most gabble applications.

pub use crate::{
    ConversationProviders, ProviderBuildConfig, build_openai_providers, config_from_env,
    conversation_from_env, openai_conversation, openai_conversation_with,
    restore_openai_conversation,
};
pub use crate::{
    ChatError, ChatErrorKind, Conversation, ConversationBuilder, ConversationConfig,
    ConversationConfigOptions, ConversationEvent, FunctionDefinition, GenerationOptions,
    Message, MessageId, ModerationPolicy, Plugin, RequestOptions, Role, TurnOptions,
};
pub use crate::{assistant_message, function_message, system_message, user_message};
pub use crate::{gb_conversation, gb_messages, gb_msg};
pub use crate::{metrics_plugin, observability_plugins, tracing_plugin};
