//! Completion-service boundary.

pub mod openai;

use crate::conversation::Message;
use crate::error::Result;

pub use openai::OpenAiChat;

/// Trait implemented by concrete chat-completion providers.
pub trait ChatProvider: Send + Sync {
    /// Returns the model's reply to `request`.
    fn complete(&self, request: &ChatRequest<'_>) -> Result<String>;
}

/// Request envelope shared by the providers.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// Role-tagged messages, system instruction first.
    pub messages: &'a [Message],
    /// Sampling temperature.
    pub temperature: f32,
}
