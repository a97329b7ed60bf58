//! OpenAI chat completion over the `/chat/completions` endpoint.

use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use refdesk::chat::{ChatMessage, ChatModel, ChatResponse, MessageRole, TokenUsage};
use refdesk::error::{Error, Result};

use crate::{api_key_from_env, build_client, missing_key_error};

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// [`ChatModel`] implementation backed by OpenAI.
///
/// Roles map one-to-one onto the wire format. The default temperature is
/// 0 so grounded answers stay deterministic.
pub struct OpenAiChat {
    api_key: Option<String>,
    model: String,
    /// `None` means the production endpoint.
    api_base: Option<String>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiChat {
    /// Creates a client with the default model and the API key from the
    /// environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: api_key_from_env(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_base: None,
            temperature: 0.0,
            max_tokens: None,
        }
    }

    /// Sets the API key explicitly.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Selects the chat model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the API base URL. Intended for tests and proxies.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Caps the completion length.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn client(&self) -> Result<async_openai::Client<async_openai::config::OpenAIConfig>> {
        let key = self.api_key.as_deref().ok_or_else(missing_key_error)?;
        Ok(build_client(key, self.api_base.as_deref()))
    }

    fn build_request(&self, messages: &[ChatMessage]) -> Result<CreateChatCompletionRequest> {
        let mut wire_messages = Vec::with_capacity(messages.len());
        for message in messages {
            wire_messages.push(convert_message(message)?);
        }

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&self.model)
            .messages(wire_messages)
            .temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request.max_tokens(max_tokens);
        }
        request
            .build()
            .map_err(|e| Error::Provider(format!("openai request build failed: {e}")))
    }
}

impl Default for OpenAiChat {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let converted = match message.role {
        MessageRole::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(|e| Error::Provider(format!("invalid system message: {e}")))?,
        ),
        MessageRole::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(|e| Error::Provider(format!("invalid user message: {e}")))?,
        ),
        MessageRole::Assistant => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(|e| Error::Provider(format!("invalid assistant message: {e}")))?,
        ),
    };
    Ok(converted)
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        let client = self.client()?;
        let request = self.build_request(messages)?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| Error::Provider(format!("openai chat request failed: {e}")))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("openai returned no choices".to_string()))?;
        let content = choice.message.content.unwrap_or_default();

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
