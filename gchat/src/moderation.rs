//! Moderation decision policy applied before a message is sent onward.

use std::sync::Arc;

use gcommon::RequestOptions;
use gprovider::{ModerationProvider, ModerationRequest};

use crate::{ChatError, ConversationConfig, ConversationHistory, Message};

#[derive(Clone, Default)]
pub struct ModerationGate {
    provider: Option<Arc<dyn ModerationProvider>>,
}

impl ModerationGate {
    pub fn new(provider: Option<Arc<dyn ModerationProvider>>) -> Self {
        Self { provider }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Checks `message` against the configured policy.
    ///
    /// Strict mode fails on any flagged category. Soft mode records the
    /// categories on the stored message and lets the turn proceed. Returns
    /// the message as stored after the check.
    pub async fn moderate_message(
        &self,
        config: &ConversationConfig,
        request_options: &RequestOptions,
        history: &ConversationHistory,
        message: &Message,
    ) -> Result<Message, ChatError> {
        if !config.is_moderation_enabled() {
            return Ok(message.clone());
        }

        let provider = self.provider.as_ref().ok_or_else(|| {
            ChatError::configuration("moderation is enabled but no moderation provider is configured")
        })?;

        tracing::debug!(phase = "moderation", event = "check", message_id = %message.id);
        let result = provider
            .moderate(
                ModerationRequest::new(message.content_str())
                    .with_credential(config.api_key.clone())
                    .with_request_options(request_options.clone()),
            )
            .await?;

        if !result.is_flagged() {
            return Ok(message.clone());
        }

        if config.is_moderation_strict() {
            tracing::warn!(
                phase = "moderation",
                event = "rejected",
                message_id = %message.id,
                categories = ?result.categories
            );
            return Err(ChatError::moderation(result.categories));
        }

        tracing::info!(
            phase = "moderation",
            event = "flagged",
            message_id = %message.id,
            categories = ?result.categories
        );
        let categories = result.categories;
        let flagged = history.update_message(&message.id, |stored| {
            stored.flags.extend(categories.iter().cloned());
        })?;

        Ok(flagged.unwrap_or_else(|| {
            let mut detached = message.clone();
            detached.flags.extend(categories);
            detached
        }))
    }
}

impl std::fmt::Debug for ModerationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationGate")
            .field("provider", &self.provider.is_some())
            .finish()
    }
}
