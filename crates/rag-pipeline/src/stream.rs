//! Background generation with incremental reads.
//!
//! One task runs the model; the caller drains text as it arrives, the way the
//! interactive demo redraws the growing answer.

use rag_types::{GenerateError, GenerationParams, TextGenerator};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Receiving side of a spawned generation.
pub struct GenerationStream {
    rx: mpsc::UnboundedReceiver<String>,
    handle: Option<JoinHandle<Result<(), GenerateError>>>,
}

/// Start generating `prompt` on a background task.
pub fn spawn_generation(
    generator: Arc<dyn TextGenerator>,
    prompt: impl Into<String>,
    params: GenerationParams,
) -> GenerationStream {
    let prompt = prompt.into();
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move { generator.stream_into(&prompt, &params, tx).await });
    GenerationStream {
        rx,
        handle: Some(handle),
    }
}

impl GenerationStream {
    /// Next piece of text, `Ok(None)` once generation has finished.
    /// A generation failure is returned after the text produced before it.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, GenerateError> {
        if let Some(chunk) = self.rx.recv().await {
            return Ok(Some(chunk));
        }
        match self.handle.take() {
            Some(handle) => {
                handle
                    .await
                    .map_err(|e| GenerateError::Other(format!("generation task failed: {}", e)))??;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Drain the stream into one string.
    pub async fn collect(mut self) -> Result<String, GenerateError> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await? {
            text.push_str(&chunk);
        }
        Ok(text)
    }
}

impl Drop for GenerationStream {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_embed::EchoGenerator;

    #[tokio::test]
    async fn chunks_arrive_in_order() {
        let gen: Arc<dyn TextGenerator> = Arc::new(EchoGenerator::new());
        let mut stream = spawn_generation(gen, "Qual o maior pais do mundo?", GenerationParams::streaming());
        let mut pieces = Vec::new();
        while let Some(p) = stream.next_chunk().await.unwrap() {
            pieces.push(p);
        }
        assert_eq!(pieces.first().map(String::as_str), Some("Qual"));
        assert_eq!(pieces.concat(), "Qual o maior pais do mundo?");
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn collect_matches_generate() {
        let gen: Arc<dyn TextGenerator> = Arc::new(EchoGenerator::new());
        let params = GenerationParams {
            max_new_tokens: 2,
            ..GenerationParams::streaming()
        };
        let direct = gen.generate("a b c", &params).await.unwrap();
        let streamed = spawn_generation(gen, "a b c", params).collect().await.unwrap();
        assert_eq!(streamed, direct);
    }

    #[tokio::test]
    async fn failure_surfaces_at_the_end() {
        let gen: Arc<dyn TextGenerator> = Arc::new(EchoGenerator::failing("model crashed"));
        let err = spawn_generation(gen, "x", GenerationParams::streaming())
            .collect()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model crashed"));
    }
}
