//! Text-completion client for the causal language model behind the inference server.
//!
//! Talks to any OpenAI-compatible `/v1/completions` endpoint (vLLM, llama.cpp server,
//! text-generation-inference), so the quantized model itself runs out of process.

use crate::sse::{SseBuffer, SseEvent};
use futures::StreamExt;
use rag_types::{GenerateError, GenerationParams, TextGenerator};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    repetition_penalty: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

/// [`TextGenerator`] backed by an OpenAI-compatible completion endpoint.
pub struct CompletionGenerator {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl CompletionGenerator {
    pub fn new(url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
            model: model.into(),
        }
    }

    /// Create from MODEL_API_URL / MODEL_API_KEY / MODEL_NAME.
    pub fn from_env() -> Self {
        let url = std::env::var("MODEL_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000/v1/completions".to_string());
        let api_key = std::env::var("MODEL_API_KEY").ok();
        let model = std::env::var("MODEL_NAME")
            .unwrap_or_else(|_| "meta-llama/Llama-3.1-8B-Instruct".to_string());
        Self::new(url, api_key, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(
        &'a self,
        prompt: &'a str,
        params: &GenerationParams,
        stream: bool,
    ) -> CompletionRequest<'a> {
        // Greedy decoding when sampling is off.
        let (temperature, top_p) = if params.do_sample {
            (params.temperature, params.top_p)
        } else {
            (0.0, 1.0)
        };
        CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: params.max_new_tokens,
            temperature,
            top_p,
            repetition_penalty: params.repetition_penalty,
            stream,
        }
    }

    async fn send(&self, body: &CompletionRequest<'_>) -> Result<reqwest::Response, GenerateError> {
        let mut req = self.client.post(&self.url).json(body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req
            .send()
            .await
            .map_err(|e| GenerateError::Other(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }
}

fn first_text(payload: &str) -> Result<Option<String>, GenerateError> {
    let parsed: CompletionResponse =
        serde_json::from_str(payload).map_err(|e| GenerateError::Parse(e.to_string()))?;
    Ok(parsed.choices.into_iter().next().map(|c| c.text))
}

#[async_trait::async_trait]
impl TextGenerator for CompletionGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerateError> {
        let started = std::time::Instant::now();
        let res = self.send(&self.request(prompt, params, false)).await?;
        let body = res
            .text()
            .await
            .map_err(|e| GenerateError::Other(e.to_string()))?;
        let text = first_text(&body)?.ok_or(GenerateError::EmptyResponse)?;
        tracing::debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion finished"
        );
        Ok(text.trim().to_string())
    }

    async fn stream_into(
        &self,
        prompt: &str,
        params: &GenerationParams,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<(), GenerateError> {
        let res = self.send(&self.request(prompt, params, true)).await?;
        let mut stream = res.bytes_stream();
        let mut sse = SseBuffer::new();
        let forward = |event: SseEvent| -> Result<bool, GenerateError> {
            match event {
                SseEvent::Done => Ok(false),
                SseEvent::Data(payload) => {
                    if let Some(text) = first_text(&payload)?.filter(|t| !t.is_empty()) {
                        // Reader gone: stop generating.
                        if tx.send(text).is_err() {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
            }
        };
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| GenerateError::Other(e.to_string()))?;
            for event in sse.push(&bytes) {
                if !forward(event)? {
                    return Ok(());
                }
            }
        }
        if let Some(event) = sse.finish() {
            forward(event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn maps_params_and_trims_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .and(body_partial_json(json!({
                "model": "llama",
                "prompt": "Q?",
                "max_tokens": 100,
                "temperature": 0.1,
                "repetition_penalty": 1.1,
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "text": "  Burj Khalifa\n" }]
            })))
            .mount(&server)
            .await;

        let gen = CompletionGenerator::new(format!("{}/v1/completions", server.uri()), None, "llama");
        let out = gen.generate("Q?", &GenerationParams::client()).await.unwrap();
        assert_eq!(out, "Burj Khalifa");
    }

    #[tokio::test]
    async fn greedy_when_sampling_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "temperature": 0.0, "top_p": 1.0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "text": "ok" }]
            })))
            .mount(&server)
            .await;
        let gen = CompletionGenerator::new(server.uri(), None, "m");
        let params = GenerationParams {
            do_sample: false,
            ..GenerationParams::default()
        };
        assert_eq!(gen.generate("p", &params).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn streams_deltas_until_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"text\":\"Brasil\"}]}\n\n",
            "data: {\"choices\":[{\"text\":\" is\"}]}\n\n",
            "data: {\"choices\":[{\"text\":\"\"}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"text\":\" ignored\"}]}\n\n"
        );
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "stream": true })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let gen = CompletionGenerator::new(server.uri(), None, "m");
        let (tx, mut rx) = mpsc::unbounded_channel();
        gen.stream_into("p", &GenerationParams::streaming(), tx)
            .await
            .unwrap();
        let mut parts = Vec::new();
        while let Some(p) = rx.recv().await {
            parts.push(p);
        }
        assert_eq!(parts, vec!["Brasil".to_string(), " is".to_string()]);
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
            .mount(&server)
            .await;
        let gen = CompletionGenerator::new(server.uri(), None, "m");
        let err = gen
            .generate("p", &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Api { status: 500, .. }));
    }
}
