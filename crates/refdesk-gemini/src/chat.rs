//! Gemini chat completion over the `generateContent` endpoint.

use async_trait::async_trait;
use refdesk::chat::{ChatMessage, ChatModel, ChatResponse, MessageRole, TokenUsage};
use refdesk::error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{api_key_from_env, missing_key_error, API_BASE};

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// [`ChatModel`] implementation backed by Gemini.
///
/// System messages are folded into the request's `systemInstruction`
/// field; user and assistant turns become `user`/`model` contents. The
/// default temperature is 0 so grounded answers stay deterministic.
pub struct GeminiChat {
    api_key: Option<String>,
    model: String,
    api_base: String,
    client: Client,
    temperature: f32,
    max_output_tokens: Option<u32>,
}

impl GeminiChat {
    /// Creates a client with the default model and the API key from the
    /// environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: api_key_from_env(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_base: API_BASE.to_string(),
            client: Client::new(),
            temperature: 0.0,
            max_output_tokens: None,
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
        self.api_base = api_base.into();
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
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(missing_key_error)
    }

    fn build_request(&self, messages: &[ChatMessage]) -> GenerateContentRequest {
        let mut system_texts: Vec<&str> = Vec::new();
        let mut contents = Vec::new();
        for message in messages {
            match message.role {
                MessageRole::System => system_texts.push(&message.content),
                MessageRole::User => contents.push(WireContent::new("user", &message.content)),
                MessageRole::Assistant => {
                    contents.push(WireContent::new("model", &message.content));
                }
            }
        }
        let system_instruction = if system_texts.is_empty() {
            None
        } else {
            Some(WireContent {
                role: None,
                parts: vec![WirePart {
                    text: system_texts.join("\n\n"),
                }],
            })
        };
        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

impl Default for GeminiChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base,
            self.model,
            self.api_key()?
        );
        let request = self.build_request(messages);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("gemini chat request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Provider(format!("gemini chat error: {e}")))?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("unparseable gemini chat response: {e}")))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("gemini returned no candidates".to_string()))?;
        let content = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .concat()
            })
            .unwrap_or_default();

        let usage = parsed.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count.unwrap_or(0),
            completion_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count.unwrap_or(0),
        });

        Ok(ChatResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Wire types for the generateContent endpoint.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

impl WireContent {
    fn new(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![WirePart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    /// Absent when the candidate was blocked before producing content.
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_deterministic() {
        let chat = GeminiChat::new().with_api_key("k");
        assert_eq!(chat.model_name(), DEFAULT_CHAT_MODEL);
        assert!(chat.temperature.abs() < f32::EPSILON);
        assert!(chat.max_output_tokens.is_none());
    }

    #[test]
    fn system_messages_become_system_instruction() {
        let chat = GeminiChat::new().with_api_key("k");
        let request = chat.build_request(&[
            ChatMessage::system("Sen bir kütüphane asistanısın."),
            ChatMessage::user("Merhaba"),
            ChatMessage::assistant("Merhaba, nasıl yardımcı olabilirim?"),
            ChatMessage::user("Çalışma saatleri nedir?"),
        ]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "Sen bir kütüphane asistanısın."
        );
        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Çalışma saatleri nedir?");
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn request_without_system_omits_the_field() {
        let chat = GeminiChat::new().with_api_key("k").with_max_output_tokens(512);
        let request = chat.build_request(&[ChatMessage::user("Soru")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn response_parsing_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Pazartesi "}, {"text": "kapalıyız."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        let usage = parsed.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, Some(12));
        assert_eq!(usage.total_token_count, Some(17));
    }

    #[test]
    fn blocked_candidate_parses_without_content() {
        let raw = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.candidates[0].content.is_none());
        assert!(parsed.usage_metadata.is_none());
    }

    #[tokio::test]
    async fn missing_key_is_a_configuration_error() {
        let chat = GeminiChat {
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_base: API_BASE.to_string(),
            client: Client::new(),
            temperature: 0.0,
            max_output_tokens: None,
        };
        let err = chat.complete(&[ChatMessage::user("soru")]).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
