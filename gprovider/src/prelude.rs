//! Common `gprovider` imports for downstream crates.

pub use crate::{
    BoxedEventStream, ChatMessage, ChatProvider, CompletionRequest, CompletionRequestBuilder,
    CompletionResponse, FinishReason, FunctionCall, FunctionDefinition, ModelEventStream,
    ModerationProvider, ModerationRequest, ModerationResult, ProviderError, ProviderErrorKind,
    ProviderId, Role, SecretString, StreamEvent, TokenUsage,
};
pub use gcommon::{BoxFuture, GenerationOptions, RequestOptions};
