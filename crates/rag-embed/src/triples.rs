//! Knowledge-graph triple extraction with a chat model.

use crate::llm::{ChatClient, ChatMessage, ChatOptions};
use async_trait::async_trait;
use rag_types::{ExtractError, ExtractedTriple, GenerateError};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Turns free text into `(subject, predicate, object)` facts.
#[async_trait]
pub trait TripleExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedTriple>, ExtractError>;
}

const SYSTEM_PROMPT: &str = r#"You are a knowledge graph construction system.
Extract factual relationships from the given text as subject-predicate-object triples.

Rules:
- Subjects and objects are concrete entities (people, organizations, places, projects, products, concepts).
- Give each entity a short type such as Person, Organization, Location, Project, Product, Event or Concept.
- Predicates are short verb phrases in upper snake case (e.g. WORKS_ON, LOCATED_IN, FOUNDED_BY).
- Use the entity names exactly as they appear in the text.

Output format:
{
    "triples": [
        {
            "subject": "Alice",
            "subject_type": "Person",
            "predicate": "WORKS_ON",
            "object": "Project X",
            "object_type": "Project"
        }
    ]
}

Only output valid JSON, no additional text.
"#;

#[derive(Debug, Deserialize)]
struct TriplesResponse {
    #[serde(default)]
    triples: Vec<ExtractedTriple>,
}

/// [`TripleExtractor`] that prompts a [`ChatClient`] in JSON mode.
pub struct LlmTripleExtractor {
    chat: Arc<dyn ChatClient>,
    options: ChatOptions,
}

impl LlmTripleExtractor {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self {
            chat,
            options: ChatOptions {
                temperature: 0.0,
                max_tokens: 1500,
                json: true,
            },
        }
    }

    fn build_prompt(&self, text: &str) -> String {
        format!(
            r#"Extract knowledge graph triples from this text:

{}

Respond with JSON only.
"#,
            text
        )
    }
}

/// Parse a model reply, tolerating prose around the JSON object.
pub fn parse_triples(reply: &str) -> Result<Vec<ExtractedTriple>, ExtractError> {
    let json_str = extract_json_from_text(reply)
        .ok_or_else(|| ExtractError::InvalidResponse("No JSON found in response".to_string()))?;
    let parsed: TriplesResponse = serde_json::from_str(json_str)
        .map_err(|e| ExtractError::InvalidResponse(format!("JSON parse error: {}", e)))?;

    let mut seen = HashSet::new();
    Ok(parsed
        .triples
        .into_iter()
        .map(|mut t| {
            t.subject = t.subject.trim().to_string();
            t.predicate = t.predicate.trim().to_string();
            t.object = t.object.trim().to_string();
            t
        })
        .filter(|t| !t.subject.is_empty() && !t.predicate.is_empty() && !t.object.is_empty())
        .filter(|t| {
            seen.insert((
                t.subject.to_lowercase(),
                t.predicate.to_lowercase(),
                t.object.to_lowercase(),
            ))
        })
        .collect())
}

fn extract_json_from_text(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[async_trait]
impl TripleExtractor for LlmTripleExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedTriple>, ExtractError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let started = std::time::Instant::now();
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(self.build_prompt(text)),
        ];
        let reply = self
            .chat
            .complete_with_messages(&messages, &self.options)
            .await
            .map_err(|e| match e {
                GenerateError::EmptyResponse => {
                    ExtractError::InvalidResponse("Empty response".to_string())
                }
                other => ExtractError::Api(other.to_string()),
            })?;
        let triples = parse_triples(&reply)?;
        tracing::debug!(
            count = triples.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extracted triples"
        );
        Ok(triples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChatClient;

    #[test]
    fn prose_around_json_is_tolerated() {
        let reply = r#"Sure! Here you go:
{"triples": [{"subject": "Alice", "subject_type": "Person", "predicate": "WORKS_ON", "object": "Project X", "object_type": "Project"}]}
Let me know if you need more."#;
        let triples = parse_triples(reply).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].object, "Project X");
    }

    #[test]
    fn incomplete_and_repeated_triples_are_dropped() {
        let reply = r#"{"triples": [
            {"subject": "Bob", "predicate": "MANAGES", "object": "Project Y"},
            {"subject": " bob ", "predicate": "manages", "object": "project y"},
            {"subject": "", "predicate": "MANAGES", "object": "Project Z"},
            {"subject": "Bob", "predicate": "KNOWS", "object": "  "}
        ]}"#;
        let triples = parse_triples(reply).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].subject, "Bob");
        assert_eq!(triples[0].subject_type, "");
    }

    #[test]
    fn triple_missing_a_key_is_dropped_alone() {
        let reply = r#"{"triples": [
            {"subject": "Alice", "object": "Project X"},
            {"predicate": "MANAGES", "object": "Project Y"},
            {"subject": "Bob", "predicate": "MANAGES", "object": "Project Y"}
        ]}"#;
        let triples = parse_triples(reply).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].subject, "Bob");
    }

    #[test]
    fn reply_without_json_is_invalid() {
        assert!(matches!(
            parse_triples("I could not find any facts."),
            Err(ExtractError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn asks_for_json_mode() {
        let chat = Arc::new(MockChatClient::new(
            r#"{"triples": [{"subject": "Rust", "predicate": "CREATED_BY", "object": "Graydon Hoare"}]}"#,
        ));
        let extractor = LlmTripleExtractor::new(chat.clone());
        let triples = extractor
            .extract("Rust was created by Graydon Hoare.")
            .await
            .unwrap();
        assert_eq!(triples.len(), 1);

        let calls = chat.calls();
        assert_eq!(calls.len(), 1);
        let (messages, options) = &calls[0];
        assert!(options.json);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("Graydon Hoare"));
    }

    #[tokio::test]
    async fn blank_text_skips_the_model() {
        let chat = Arc::new(MockChatClient::new("{}"));
        let extractor = LlmTripleExtractor::new(chat.clone());
        assert!(extractor.extract("   ").await.unwrap().is_empty());
        assert!(chat.calls().is_empty());
    }
}
