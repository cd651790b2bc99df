//! Chat-completion client used to answer questions over retrieved context.

use async_trait::async_trait;
use rag_types::GenerateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message for LLM conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call sampling options.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask for a JSON object response (`response_format: json_object`).
    pub json: bool,
}

impl Default for ChatOptions {
    /// Settings for grounded RAG answers.
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 500,
            json: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat model client.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Complete with conversation messages.
    async fn complete_with_messages(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<String, GenerateError>;

    /// Complete a single user prompt.
    async fn complete(&self, prompt: &str, options: &ChatOptions) -> Result<String, GenerateError> {
        self.complete_with_messages(&[ChatMessage::user(prompt)], options)
            .await
    }
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Create from LLM_API_URL / LLM_API_KEY (or OPENAI_API_KEY) / LLM_MODEL.
    /// Returns `None` when no API key is configured.
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()?;
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Some(Self::new(api_url, api_key, model))
    }
}

impl fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete_with_messages(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<String, GenerateError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format: options
                .json
                .then(|| serde_json::json!({ "type": "json_object" })),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerateError::Other(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Parse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GenerateError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_options_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 500,
                "messages": [{ "role": "system", "content": "be brief" }, { "role": "user", "content": "hi" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
            })))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(server.uri(), "sk-test", "gpt-4o-mini");
        let out = client
            .complete_with_messages(
                &[ChatMessage::system("be brief"), ChatMessage::user("hi")],
                &ChatOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn json_mode_sets_response_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "{}" } }]
            })))
            .mount(&server)
            .await;
        let client = OpenAiChatClient::new(server.uri(), "k", "m");
        let opts = ChatOptions {
            json: true,
            ..ChatOptions::default()
        };
        assert_eq!(client.complete("x", &opts).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn api_errors_and_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;
        let client = OpenAiChatClient::new(server.uri(), "k", "m");
        match client.complete("x", &ChatOptions::default()).await {
            Err(GenerateError::Api { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;
        let client = OpenAiChatClient::new(server.uri(), "k", "m");
        assert!(matches!(
            client.complete("x", &ChatOptions::default()).await,
            Err(GenerateError::EmptyResponse)
        ));
    }
}
