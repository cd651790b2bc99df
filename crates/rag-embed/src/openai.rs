//! HTTP client for OpenAI-compatible embedding APIs (OpenAI, text-embeddings-inference, ...).

use rag_types::{Embedder, EmbedderError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Option<Vec<EmbedItem>>,
}

#[derive(Debug, Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Sentence-embedding model used when EMBED_MODEL is not set.
pub const DEFAULT_EMBED_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Embedder that calls an OpenAI-compatible embedding endpoint (e.g. POST /v1/embeddings).
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(url: String, api_key: Option<String>, model: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            model: model.unwrap_or(DEFAULT_EMBED_MODEL).to_string(),
        }
    }

    pub fn from_env() -> Self {
        let url = std::env::var("EMBED_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080/v1/embeddings".to_string());
        let api_key = std::env::var("EMBED_API_KEY").ok();
        let model = std::env::var("EMBED_MODEL").ok();
        Self::new(url, api_key, model.as_deref())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "input": texts,
            "model": self.model
        });
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req
            .send()
            .await
            .map_err(|e| EmbedderError::Other(e.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| EmbedderError::Other(e.to_string()))?;
        if !status.is_success() {
            return Err(EmbedderError::Other(format!(
                "embed API error {}: {}",
                status, body
            )));
        }
        let parsed: EmbedResponse =
            serde_json::from_str(&body).map_err(|e| EmbedderError::Other(e.to_string()))?;
        let mut items = parsed.data.ok_or(EmbedderError::EmptyResponse)?;
        if items.len() != texts.len() {
            return Err(EmbedderError::Other(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                items.len()
            )));
        }
        items.sort_by_key(|i| i.index.unwrap_or(usize::MAX));
        tracing::debug!(count = items.len(), model = %self.model, "embedded batch");
        Ok(items.into_iter().map(|i| i.embedding).collect())
    }
}
