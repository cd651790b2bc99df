//! Deterministic stand-ins for the model clients: no network, stable output.

use crate::llm::{ChatClient, ChatMessage, ChatOptions};
use crate::triples::TripleExtractor;
use rag_types::{
    Embedder, EmbedderError, ExtractError, ExtractedTriple, GenerateError, GenerationParams,
    TextGenerator,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use tokio::sync::mpsc;

const DIM: usize = 384;

/// Bag-of-words hashing embedder: texts sharing words get similar vectors.
pub struct MockEmbedder;

impl MockEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % DIM as u64) as usize] += 1.0;
        }
        let norm: f64 = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x = (*x as f64 / norm) as f32;
            }
        }
        v
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Chat client with a fixed reply that records every request.
pub struct MockChatClient {
    reply: String,
    calls: Mutex<Vec<(Vec<ChatMessage>, ChatOptions)>>,
}

impl MockChatClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<ChatMessage>, ChatOptions)> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl ChatClient for MockChatClient {
    async fn complete_with_messages(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<String, GenerateError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((messages.to_vec(), options.clone()));
        Ok(self.reply.clone())
    }
}

/// Generator that echoes the prompt's words, capped at `max_new_tokens`.
#[derive(Default)]
pub struct EchoGenerator {
    fail: Option<String>,
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail: Some(message.into()),
        }
    }

    fn words<'a>(&self, prompt: &'a str, params: &GenerationParams) -> Result<Vec<&'a str>, GenerateError> {
        if let Some(ref msg) = self.fail {
            return Err(GenerateError::Other(msg.clone()));
        }
        Ok(prompt
            .split_whitespace()
            .take(params.max_new_tokens as usize)
            .collect())
    }
}

#[async_trait::async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerateError> {
        Ok(self.words(prompt, params)?.join(" "))
    }

    async fn stream_into(
        &self,
        prompt: &str,
        params: &GenerationParams,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<(), GenerateError> {
        for (i, word) in self.words(prompt, params)?.into_iter().enumerate() {
            let piece = if i == 0 {
                word.to_string()
            } else {
                format!(" {}", word)
            };
            if tx.send(piece).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Extractor returning the preset triples whose subject or object occurs in the text.
pub struct StaticTripleExtractor {
    triples: Vec<ExtractedTriple>,
}

impl StaticTripleExtractor {
    pub fn new(triples: Vec<ExtractedTriple>) -> Self {
        Self { triples }
    }
}

#[async_trait::async_trait]
impl TripleExtractor for StaticTripleExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedTriple>, ExtractError> {
        let haystack = text.to_lowercase();
        Ok(self
            .triples
            .iter()
            .filter(|t| {
                haystack.contains(&t.subject.to_lowercase())
                    || haystack.contains(&t.object.to_lowercase())
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn shared_words_are_closer() {
        let e = MockEmbedder::new();
        let q = e.embed("tallest building").await.unwrap();
        let near = e.embed("The Burj Khalifa is the tallest building").await.unwrap();
        let far = e.embed("Neural networks learn representations").await.unwrap();
        assert_eq!(q.len(), DIM);
        assert!(dot(&q, &near) > dot(&q, &far));
    }

    #[tokio::test]
    async fn echo_stream_matches_generate() {
        let g = EchoGenerator::new();
        let params = GenerationParams {
            max_new_tokens: 3,
            ..GenerationParams::default()
        };
        let full = g.generate("one two  three four", &params).await.unwrap();
        assert_eq!(full, "one two three");

        let (tx, mut rx) = mpsc::unbounded_channel();
        g.stream_into("one two  three four", &params, tx).await.unwrap();
        let mut streamed = String::new();
        while let Some(piece) = rx.recv().await {
            streamed.push_str(&piece);
        }
        assert_eq!(streamed, full);
    }

    #[tokio::test]
    async fn static_extractor_matches_mentions() {
        let ex = StaticTripleExtractor::new(vec![ExtractedTriple {
            subject: "Alice".to_string(),
            subject_type: "Person".to_string(),
            predicate: "WORKS_ON".to_string(),
            object: "Project X".to_string(),
            object_type: "Project".to_string(),
        }]);
        assert_eq!(ex.extract("alice writes code").await.unwrap().len(), 1);
        assert!(ex.extract("nobody here").await.unwrap().is_empty());
    }
}
