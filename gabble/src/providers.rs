//! Stable provider construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::{ChatProvider, ConversationBuilder, ModerationProvider, ProviderError};

#[derive(Clone)]
pub struct ProviderBuildConfig {
    /// Fallback key for requests that carry no credential of their own.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for ProviderBuildConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout: Duration::from_secs(90),
        }
    }
}

impl ProviderBuildConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ProviderBuildConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBuildConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Completion and moderation collaborators backed by one remote service.
#[derive(Clone)]
pub struct ConversationProviders {
    pub chat: Arc<dyn ChatProvider>,
    pub moderation: Arc<dyn ModerationProvider>,
}

impl ConversationProviders {
    pub fn attach(self, builder: ConversationBuilder) -> ConversationBuilder {
        builder
            .chat_provider(self.chat)
            .moderation_provider(self.moderation)
    }
}

impl std::fmt::Debug for ConversationProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationProviders")
            .field("chat", &self.chat.id())
            .finish_non_exhaustive()
    }
}

pub fn build_openai_providers(
    config: ProviderBuildConfig,
) -> Result<ConversationProviders, ProviderError> {
    let api_key = match config.api_key.as_deref().map(str::trim) {
        Some("") => {
            return Err(ProviderError::authentication(
                "provider API key must not be empty",
            ));
        }
        other => other.map(str::to_string),
    };

    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))?;

    build_openai(api_key, config.base_url, http)
}

#[cfg(feature = "provider-openai")]
fn build_openai(
    api_key: Option<String>,
    base_url: Option<String>,
    http: Client,
) -> Result<ConversationProviders, ProviderError> {
    use gprovider::adapters::openai::{OpenAiHttpTransport, OpenAiProvider};

    let mut transport = OpenAiHttpTransport::new(http);
    if let Some(base_url) = base_url {
        transport = transport.with_base_url(base_url);
    }

    let mut provider = OpenAiProvider::new(Arc::new(transport));
    if let Some(api_key) = api_key {
        provider = provider.with_api_key(gprovider::SecretString::new(api_key));
    }

    let provider = Arc::new(provider);
    Ok(ConversationProviders {
        chat: provider.clone(),
        moderation: provider,
    })
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai(
    _api_key: Option<String>,
    _base_url: Option<String>,
    _http: Client,
) -> Result<ConversationProviders, ProviderError> {
    Err(ProviderError::invalid_request(
        "provider-openai feature is not enabled on gabble",
    ))
}

#[cfg(test)]
mod tests {
    use super::{ProviderBuildConfig, build_openai_providers};
    use crate::ProviderErrorKind;

    #[test]
    fn blank_api_key_is_rejected() {
        let error = build_openai_providers(ProviderBuildConfig::new("   "))
            .expect_err("blank key must fail");
        assert_eq!(error.kind, ProviderErrorKind::Authentication);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = ProviderBuildConfig::new("sk-secret").with_base_url("http://localhost:8080");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("localhost:8080"));
    }

    #[cfg(feature = "provider-openai")]
    #[test]
    fn keyless_config_builds_openai_providers() {
        let providers = build_openai_providers(ProviderBuildConfig::default())
            .expect("providers should build");
        assert_eq!(providers.chat.id(), crate::ProviderId::OpenAi);
    }
}
