//! Small convenience constructors and environment parsing.

use crate::{ConversationConfigOptions, Message, ModerationPolicy};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "GABBLE_MODEL";
pub const STREAM_ENV: &str = "GABBLE_STREAM";
pub const DISABLE_MODERATION_ENV: &str = "GABBLE_DISABLE_MODERATION";

pub fn system_message(content: impl Into<String>) -> Message {
    Message::system(content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::user(content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::assistant(content)
}

pub fn function_message(name: impl Into<String>, content: impl Into<String>) -> Message {
    Message::function(name, content)
}

/// Accepts `true`, `false`, or `soft` (case-insensitive).
pub fn parse_moderation_policy(value: &str) -> Option<ModerationPolicy> {
    ModerationPolicy::parse(value)
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Reads conversation options from the process environment.
///
/// Unset, blank, or unparseable variables are left unset.
pub fn config_from_env() -> ConversationConfigOptions {
    config_from_lookup(|name| std::env::var(name).ok())
}

pub fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConversationConfigOptions {
    let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let mut options = ConversationConfigOptions::default();
    if let Some(api_key) = read(API_KEY_ENV) {
        options = options.with_api_key(api_key.trim());
    }
    if let Some(model) = read(MODEL_ENV) {
        options = options.with_model(model.trim());
    }
    if let Some(stream) = read(STREAM_ENV).as_deref().and_then(parse_flag) {
        options = options.with_stream(stream);
    }
    if let Some(policy) = read(DISABLE_MODERATION_ENV)
        .as_deref()
        .and_then(parse_moderation_policy)
    {
        options = options.with_moderation(policy);
    }
    options
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{ConversationConfig, ModerationPolicy, Role};

    use super::{config_from_lookup, function_message, parse_flag, parse_moderation_policy};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn parse_moderation_policy_supports_tri_state() {
        assert_eq!(parse_moderation_policy("false"), Some(ModerationPolicy::Strict));
        assert_eq!(parse_moderation_policy("SOFT"), Some(ModerationPolicy::Soft));
        assert_eq!(parse_moderation_policy("true"), Some(ModerationPolicy::Disabled));
        assert_eq!(parse_moderation_policy("maybe"), None);
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("On"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("sometimes"), None);
    }

    #[test]
    fn env_lookup_populates_options() {
        let options = config_from_lookup(lookup(&[
            ("OPENAI_API_KEY", " sk-env "),
            ("GABBLE_MODEL", "gpt-4o"),
            ("GABBLE_STREAM", "true"),
            ("GABBLE_DISABLE_MODERATION", "soft"),
        ]));
        let config = ConversationConfig::resolve(options);

        assert_eq!(config.api_key.as_ref().map(|key| key.expose()), Some("sk-env"));
        assert_eq!(config.model, "gpt-4o");
        assert!(config.stream);
        assert!(!config.dry);
        assert!(config.is_moderation_soft());
    }

    #[test]
    fn empty_env_means_dry_defaults() {
        let config = ConversationConfig::resolve(config_from_lookup(lookup(&[
            ("OPENAI_API_KEY", "  "),
            ("GABBLE_STREAM", "perhaps"),
        ])));
        assert!(config.dry);
        assert!(!config.stream);
        assert_eq!(config.moderation, ModerationPolicy::Strict);
    }

    #[test]
    fn function_message_carries_name() {
        let message = function_message("lookup", "42");
        assert_eq!(message.role, Role::Function);
        assert_eq!(message.name.as_deref(), Some("lookup"));
    }
}
