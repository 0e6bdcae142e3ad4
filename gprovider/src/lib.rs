//! Provider contracts shared by the gabble conversation engine.
//!
//! ```rust
//! use gprovider::{ChatMessage, CompletionRequest, Role};
//!
//! let request = CompletionRequest::builder("gpt-4o-mini")
//!     .message(ChatMessage::new(Role::System, "You are terse."))
//!     .message(ChatMessage::new(Role::User, "hello"))
//!     .build()
//!     .expect("request should be valid");
//!
//! assert_eq!(request.messages.len(), 2);
//! ```

mod credentials;
mod error;
mod model;
mod provider;
mod stream;

#[cfg(feature = "provider-openai")]
pub mod adapters;
pub mod prelude;

pub use credentials::SecretString;
pub use error::{ProviderError, ProviderErrorKind};
pub use model::{
    ChatMessage, CompletionRequest, CompletionRequestBuilder, CompletionResponse, FinishReason,
    FunctionCall, FunctionDefinition, ModerationRequest, ModerationResult, ProviderId, Role,
    TokenUsage,
};
pub use provider::{ChatProvider, ModerationProvider, ProviderFuture};
pub use stream::{BoxedEventStream, ModelEventStream, StreamEvent, VecEventStream};
