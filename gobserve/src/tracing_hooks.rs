//! Tracing plugin: one structured event per conversation hook.
//!
//! ```rust
//! use gobserve::tracing_plugin;
//!
//! let plugin = tracing_plugin();
//! assert!(plugin.hooks().contains(&"on_user_prompt"));
//! ```

use gchat::Plugin;

pub const TRACING_PLUGIN_NAME: &str = "tracing";

/// Logs every hook at `info`, errors at `error`. Transforms pass values through.
pub fn tracing_plugin() -> Plugin {
    Plugin::builder(TRACING_PLUGIN_NAME)
        .on_init(|context, data| async move {
            tracing::info!(
                phase = "conversation",
                event = "init",
                conversation_id = %context.conversation_id,
                model = context.config.model.as_str(),
                dry = context.config.dry,
                moderation = ?context.config.moderation,
                restored_data = data.is_some()
            );
            Ok(())
        })
        .on_user_prompt(|message| async move {
            tracing::info!(
                phase = "conversation",
                event = "user_prompt",
                message_id = %message.id,
                content_len = message.content_str().len()
            );
            Ok(())
        })
        .on_function_prompt(|message| async move {
            tracing::info!(
                phase = "conversation",
                event = "function_prompt",
                message_id = %message.id,
                function = message.name.as_deref().unwrap_or_default(),
                content_len = message.content_str().len()
            );
            Ok(())
        })
        .on_user_prompt_error(|error| async move {
            tracing::error!(
                phase = "conversation",
                event = "user_prompt_error",
                error_kind = error.kind.as_str(),
                flagged = ?error.flagged_categories,
                error = %error
            );
            Ok(())
        })
        .on_function_prompt_error(|error| async move {
            tracing::error!(
                phase = "conversation",
                event = "function_prompt_error",
                error_kind = error.kind.as_str(),
                error = %error
            );
            Ok(())
        })
        .transform_function_result(|result| async move {
            tracing::debug!(
                phase = "function",
                event = "result",
                is_string = result.is_string()
            );
            Ok(result)
        })
        .transform_conversation_json(|json| async move {
            tracing::debug!(
                phase = "conversation",
                event = "serialize",
                conversation_id = json.get("id").and_then(|id| id.as_str()).unwrap_or_default()
            );
            Ok(json)
        })
        .build()
}
