mod auth;
mod provider;
mod serde_api;
mod tests;
mod transport;
mod types;

pub use provider::OpenAiProvider;
pub use transport::{DEFAULT_OPENAI_BASE_URL, OpenAiChunkStream, OpenAiHttpTransport, OpenAiTransport};
pub use types::{
    OpenAiAuth, OpenAiFinishReason, OpenAiModerationRequest, OpenAiModerationResponse,
    OpenAiRequest, OpenAiResponse, OpenAiStreamChunk, OpenAiUsage,
};
