pub mod client;
pub mod error;
pub mod retry;
pub mod scripted;
pub mod types;

use async_trait::async_trait;

pub use client::AnthropicClient;
pub use error::GenerationError;
pub use retry::RetryConfig;
pub use scripted::ScriptedGenerator;
pub use types::{ConversationTurn, Message, MessagesRequest, MessagesResponse, Role, Usage};

/// The opaque text-generation capability: given a conversation, produce the
/// next assistant utterance.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        conversation: &[ConversationTurn],
    ) -> Result<String, GenerationError>;
}
