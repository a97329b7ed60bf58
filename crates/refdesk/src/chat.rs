//! Chat model interface consumed by the answer composer.
//!
//! Deliberately thin: the composer sends one prompt and reads back text
//! plus optional token usage. Provider behavior (retries, streaming,
//! tool calls) is outside this crate's scope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction.
    System,
    /// End-user turn.
    User,
    /// Model turn.
    Assistant,
}

/// One message in a chat exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker role.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by a provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total billed tokens.
    pub total_tokens: u32,
}

/// A completed chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The model's reply text.
    pub content: String,
    /// Usage stats, if the provider reports them.
    pub usage: Option<TokenUsage>,
}

/// Interface for chat/completion models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends the messages and returns the model's reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatResponse>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
