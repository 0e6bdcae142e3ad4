use std::future::Future;
use std::pin::Pin;

use crate::{
    BoxedEventStream, CompletionRequest, CompletionResponse, ModerationRequest, ModerationResult,
    ProviderError, ProviderId,
};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote chat completion collaborator.
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn complete<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ProviderFuture<'a, Result<CompletionResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>>;
}

/// Remote content moderation collaborator.
pub trait ModerationProvider: Send + Sync {
    fn moderate<'a>(
        &'a self,
        request: ModerationRequest,
    ) -> ProviderFuture<'a, Result<ModerationResult, ProviderError>>;
}
