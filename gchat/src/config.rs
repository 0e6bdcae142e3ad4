//! Conversation configuration: raw options and the resolved, derived state.
//!
//! ```rust
//! use gchat::{ConversationConfig, ConversationConfigOptions, ModerationPolicy};
//!
//! let offline = ConversationConfig::resolve(ConversationConfigOptions::default());
//! assert!(offline.dry);
//! assert!(!offline.is_moderation_enabled());
//!
//! let online = ConversationConfig::resolve(
//!     ConversationConfigOptions::default()
//!         .with_api_key("sk-test")
//!         .with_moderation(ModerationPolicy::Soft),
//! );
//! assert!(!online.dry);
//! assert!(online.is_moderation_soft());
//! ```

use gcommon::GenerationOptions;
use gprovider::SecretString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Requested moderation mode, persisted as `disableModeration`.
///
/// `Strict` is `false`, `Disabled` is `true`, and `Soft` is `"soft"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModerationPolicy {
    #[default]
    Strict,
    Soft,
    Disabled,
}

impl ModerationPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "false" => Some(Self::Strict),
            "soft" => Some(Self::Soft),
            "true" => Some(Self::Disabled),
            _ => None,
        }
    }
}

impl Serialize for ModerationPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Strict => serializer.serialize_bool(false),
            Self::Disabled => serializer.serialize_bool(true),
            Self::Soft => serializer.serialize_str("soft"),
        }
    }
}

impl<'de> Deserialize<'de> for ModerationPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Mode(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(false) => Ok(Self::Strict),
            Repr::Flag(true) => Ok(Self::Disabled),
            Repr::Mode(mode) if mode == "soft" => Ok(Self::Soft),
            Repr::Mode(other) => Err(serde::de::Error::custom(format!(
                "disableModeration must be true, false, or \"soft\", got \"{other}\""
            ))),
        }
    }
}

/// Raw caller input; every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationConfigOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_moderation: Option<ModerationPolicy>,
    pub sampling: GenerationOptions,
}

impl ConversationConfigOptions {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = SecretString::non_blank(api_key);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn with_dry(mut self, dry: bool) -> Self {
        self.dry = Some(dry);
        self
    }

    pub fn with_moderation(mut self, policy: ModerationPolicy) -> Self {
        self.disable_moderation = Some(policy);
        self
    }

    pub fn with_sampling(mut self, sampling: GenerationOptions) -> Self {
        self.sampling = sampling;
        self
    }

    /// Layers `overrides` on top of these options; set values in `overrides` win.
    pub fn merged_with(&self, overrides: &ConversationConfigOptions) -> ConversationConfigOptions {
        ConversationConfigOptions {
            api_key: overrides.api_key.clone().or_else(|| self.api_key.clone()),
            model: overrides.model.clone().or_else(|| self.model.clone()),
            stream: overrides.stream.or(self.stream),
            dry: overrides.dry.or(self.dry),
            disable_moderation: overrides.disable_moderation.or(self.disable_moderation),
            sampling: self.sampling.merged_with(&overrides.sampling),
        }
    }
}

/// Resolved configuration derived from [`ConversationConfigOptions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "ConversationConfigOptions",
    into = "ConversationConfigOptions"
)]
pub struct ConversationConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub stream: bool,
    /// Sampling knobs; `model` and `stream` are lifted to the fields above.
    pub sampling: GenerationOptions,
    /// Always `true` when no credential is configured.
    pub dry: bool,
    pub moderation: ModerationPolicy,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self::resolve(ConversationConfigOptions::default())
    }
}

impl ConversationConfig {
    pub fn resolve(options: ConversationConfigOptions) -> Self {
        let api_key = options
            .api_key
            .and_then(|key| SecretString::non_blank(key.expose()));
        let mut sampling = options.sampling;
        let model = options
            .model
            .or(sampling.model.take())
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let stream = options.stream.or(sampling.stream.take()).unwrap_or(false);
        let dry = api_key.is_none() || options.dry.unwrap_or(false);

        Self {
            api_key,
            model,
            stream,
            sampling,
            dry,
            moderation: options.disable_moderation.unwrap_or_default(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn is_moderation_strict(&self) -> bool {
        self.has_credential() && self.moderation == ModerationPolicy::Strict
    }

    pub fn is_moderation_soft(&self) -> bool {
        self.has_credential() && self.moderation == ModerationPolicy::Soft
    }

    pub fn is_moderation_enabled(&self) -> bool {
        self.is_moderation_strict() || self.is_moderation_soft()
    }

    /// Effective sampling for one call; `overrides` win over stored values.
    pub fn generation_options(&self, overrides: &GenerationOptions) -> GenerationOptions {
        let stored = self
            .sampling
            .clone()
            .with_model(self.model.clone())
            .with_streaming(self.stream);
        stored.merged_with(overrides)
    }
}

impl From<ConversationConfigOptions> for ConversationConfig {
    fn from(value: ConversationConfigOptions) -> Self {
        Self::resolve(value)
    }
}

impl From<ConversationConfig> for ConversationConfigOptions {
    fn from(value: ConversationConfig) -> Self {
        Self {
            api_key: value.api_key,
            model: Some(value.model),
            stream: Some(value.stream),
            dry: Some(value.dry),
            disable_moderation: Some(value.moderation),
            sampling: value.sampling,
        }
    }
}
