//! OpenAI auth resolution policy.

use crate::{ProviderError, SecretString};

use super::types::OpenAiAuth;

/// Resolves bearer auth, preferring the per-request credential over the
/// provider's configured key.
pub(crate) fn resolve_openai_auth(
    request_credential: Option<&SecretString>,
    default_key: Option<&SecretString>,
) -> Result<OpenAiAuth, ProviderError> {
    request_credential
        .or(default_key)
        .filter(|key| !key.is_empty())
        .map(|key| OpenAiAuth::ApiKey(key.clone()))
        .ok_or_else(|| ProviderError::authentication("no OpenAI API key configured"))
}
