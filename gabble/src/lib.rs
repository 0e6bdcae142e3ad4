//! Unified facade over the gabble workspace crates.
//!
//! This crate is meant to be the single dependency for most applications.
//! It re-exports the conversation engine, provider contracts, and
//! observability plugins, and adds OpenAI wiring and environment config.
//!
//! ```rust
//! use gabble::{ConversationConfigOptions, TurnOptions, openai_conversation};
//!
//! let runtime = tokio::runtime::Runtime::new().expect("runtime should start");
//! runtime.block_on(async {
//!     let conversation = openai_conversation(ConversationConfigOptions::default())
//!         .expect("providers should build")
//!         .system_message("You are concise.")
//!         .build()
//!         .await
//!         .expect("conversation should build");
//!
//!     let reply = conversation
//!         .prompt("hello", TurnOptions::default())
//!         .await
//!         .expect("keyless conversations run dry");
//!     assert_eq!(reply.content_str(), "hello");
//! });
//! ```

mod macros;

pub mod prelude;
pub mod providers;
pub mod runtime;
pub mod util;

pub use gchat;
pub use gcommon;
pub use gfunctions;
pub use gobserve;
pub use gprovider;

pub use gchat::{
    CallableFunctions, ChatError, ChatErrorKind, Conversation, ConversationBuilder,
    ConversationConfig, ConversationConfigOptions, ConversationEvent, ConversationHistory,
    ConversationJson, DEFAULT_MODEL, Message, ModerationPolicy, Plugin, PluginBuilder,
    PluginContext, PluginFuture, TurnOptions, default_plugins, set_default_plugins,
};
pub use gcommon::{BoxFuture, ConversationId, GenerationOptions, MessageId, RequestOptions};
pub use gfunctions::{
    FunctionError, FunctionErrorKind, parse_json_object, parse_json_value, required_string,
    stringify_function_result,
};
pub use gobserve::{metrics_plugin, observability_plugins, tracing_plugin};
pub use gprovider::{
    BoxedEventStream, ChatMessage, ChatProvider, CompletionRequest, CompletionResponse,
    FinishReason, FunctionCall, FunctionDefinition, ModelEventStream, ModerationProvider,
    ModerationRequest, ModerationResult, ProviderError, ProviderErrorKind, ProviderFuture,
    ProviderId, Role, SecretString, StreamEvent, TokenUsage, VecEventStream,
};

pub use providers::{ConversationProviders, ProviderBuildConfig, build_openai_providers};
pub use runtime::{
    conversation_from_env, openai_conversation, openai_conversation_with,
    restore_openai_conversation,
};
pub use util::{
    assistant_message, config_from_env, config_from_lookup, function_message, parse_flag,
    parse_moderation_policy, system_message, user_message,
};

#[cfg(test)]
mod tests {
    use crate::Role;

    #[test]
    fn gb_msg_macro_creates_expected_message() {
        let message = crate::gb_msg!(user => "hello");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content_str(), "hello");
    }

    #[test]
    fn gb_messages_macro_builds_message_vector() {
        let messages = crate::gb_messages![
            system => "You are concise.",
            user => "Summarize the repo",
            function("lookup") => "{}",
        ];

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].name.as_deref(), Some("lookup"));
    }

    #[tokio::test]
    async fn gb_conversation_macro_seeds_system_message() {
        let conversation = crate::gb_conversation!("Be brief.")
            .without_default_plugins()
            .build()
            .await
            .expect("conversation should build");
        let messages = conversation.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::System);
    }
}
