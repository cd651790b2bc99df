//! Client for the inference server's own `POST /generate` endpoint.

use rag_types::{GenerateError, GenerateRequest, GenerationParams, TextGenerator};
use serde_json::Value;

/// [`TextGenerator`] that forwards prompts to a running inference server.
pub struct RemoteGenerator {
    client: reqwest::Client,
    url: String,
}

impl RemoteGenerator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// GENERATE_API_URL, defaulting to the local server.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("GENERATE_API_URL")
                .unwrap_or_else(|_| "http://localhost:5000/generate".to_string()),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl TextGenerator for RemoteGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerateError> {
        let res = self
            .client
            .post(&self.url)
            .json(&GenerateRequest::new(prompt, params))
            .send()
            .await
            .map_err(|e| GenerateError::Other(e.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| GenerateError::Other(e.to_string()))?;
        if status != reqwest::StatusCode::OK {
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: Value =
            serde_json::from_str(&body).map_err(|e| GenerateError::Parse(e.to_string()))?;
        match parsed.get("response") {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(GenerateError::Parse("No response key in JSON".to_string())),
        }
    }
}
