//! Scripted chat model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use refdesk::chat::{ChatMessage, ChatModel, ChatResponse, TokenUsage};
use refdesk::error::{Error, Result};

/// Chat model that replays scripted replies in order.
///
/// Every prompt it receives is recorded, so tests can assert on the
/// exact messages a composer sent. Running out of scripted replies is a
/// provider error, which doubles as a budget check on how many chat
/// calls a code path makes.
pub struct MockChatModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    usage: Option<TokenUsage>,
}

impl MockChatModel {
    /// Creates a model that answers with the given replies, in order.
    #[must_use]
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_string()).collect()),
            requests: Mutex::new(Vec::new()),
            usage: None,
        }
    }

    /// Attaches token usage to every response.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// All prompts received so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if a previous caller poisoned the internal lock.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of scripted replies not yet consumed.
    ///
    /// # Panics
    ///
    /// Panics if a previous caller poisoned the internal lock.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        self.requests
            .lock()
            .map_err(|_| Error::Other("mock chat lock poisoned".to_string()))?
            .push(messages.to_vec());
        let reply = self
            .replies
            .lock()
            .map_err(|_| Error::Other("mock chat lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| Error::Provider("mock chat has no scripted reply left".to_string()))?;
        Ok(ChatResponse {
            content: reply,
            usage: self.usage,
        })
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}
