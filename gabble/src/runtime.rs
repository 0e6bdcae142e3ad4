//! Conversation wiring helpers for OpenAI-backed usage.

use crate::{
    Conversation, ConversationBuilder, ConversationConfigOptions, ProviderBuildConfig,
    ProviderError, build_openai_providers, config_from_env,
};

/// A builder wired to OpenAI for both completion and moderation.
///
/// The conversation's own `api_key` is sent on every request; without one the
/// conversation runs dry and never reaches the network.
pub fn openai_conversation(
    options: ConversationConfigOptions,
) -> Result<ConversationBuilder, ProviderError> {
    openai_conversation_with(options, ProviderBuildConfig::default())
}

pub fn openai_conversation_with(
    options: ConversationConfigOptions,
    provider_config: ProviderBuildConfig,
) -> Result<ConversationBuilder, ProviderError> {
    let providers = build_openai_providers(provider_config)?;
    Ok(providers.attach(Conversation::builder().config(options)))
}

/// [`openai_conversation`] configured from the process environment.
pub fn conversation_from_env() -> Result<ConversationBuilder, ProviderError> {
    openai_conversation(config_from_env())
}

/// Restores a persisted conversation and reattaches OpenAI providers.
pub fn restore_openai_conversation(
    json: serde_json::Value,
    provider_config: ProviderBuildConfig,
) -> Result<ConversationBuilder, crate::ChatError> {
    let builder = Conversation::from_json(json)?;
    let providers = build_openai_providers(provider_config)?;
    Ok(providers.attach(builder))
}
