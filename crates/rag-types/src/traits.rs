//! Traits for the external services the pipelines call, and their errors.

use crate::{GenerationParams, GraphNode, GraphRelationship, GraphStats, ParamError, RagAnswer, Triple};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Graph database abstraction (the subset of Cypher the demos need).
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Remove every node and relationship.
    async fn clear(&self) -> Result<(), GraphStoreError>;

    /// Create nodes, or merge properties into nodes with the same id.
    async fn upsert_nodes(&self, nodes: &[GraphNode]) -> Result<(), GraphStoreError>;

    /// Create relationships between existing nodes. A repeated `(from, type, to)` is stored once.
    async fn add_relationships(&self, rels: &[GraphRelationship]) -> Result<(), GraphStoreError>;

    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError>;

    /// `MATCH (a:from_label)-[:rel_type]->(b:to_label)`, ordered by subject then object name.
    async fn find_pattern(
        &self,
        from_label: &str,
        rel_type: &str,
        to_label: &str,
    ) -> Result<Vec<Triple>, GraphStoreError>;

    /// Nodes whose name contains `term` (case-insensitive), ordered by name.
    async fn search_nodes(&self, term: &str, limit: usize) -> Result<Vec<GraphNode>, GraphStoreError>;

    /// Outgoing then incoming relationships of a node.
    async fn relationships_of(
        &self,
        node_id: &str,
        limit: usize,
    ) -> Result<Vec<Triple>, GraphStoreError>;

    async fn stats(&self) -> Result<GraphStats, GraphStoreError>;
}

/// Result of a vector search hit. `score` is cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VecSearchHit {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub score: f64,
}

impl VecSearchHit {
    /// Cosine distance (`1 - similarity`).
    pub fn distance(&self) -> f64 {
        1.0 - self.score
    }
}

/// Item for the vector store (id, vector, document text, metadata).
#[derive(Clone, Debug, PartialEq)]
pub struct VecStoreItem {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl VecStoreItem {
    pub fn into_hit(self, score: f64) -> VecSearchHit {
        VecSearchHit {
            id: self.id,
            document: self.document,
            metadata: self.metadata,
            score,
        }
    }
}

/// Vector store abstraction over named collections.
#[async_trait]
pub trait VecStore: Send + Sync {
    /// Add items, replacing any with the same id.
    async fn add(&self, items: &[VecStoreItem], collection: Option<&str>)
        -> Result<(), VecStoreError>;

    /// Search by vector, most similar first. `filter` matches metadata keys exactly.
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
        collection: Option<&str>,
    ) -> Result<Vec<VecSearchHit>, VecStoreError>;

    async fn get_by_ids(
        &self,
        ids: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<VecStoreItem>, VecStoreError>;

    async fn delete(&self, ids: &[String], collection: Option<&str>) -> Result<(), VecStoreError>;

    /// Number of items in a collection (0 when it does not exist).
    async fn count(&self, collection: Option<&str>) -> Result<usize, VecStoreError>;

    async fn list_collections(&self) -> Result<Vec<String>, VecStoreError>;
}

/// Embedder: text -> vector(s).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Default implementation uses embed_batch.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let v = self.embed_batch(&[text.to_string()]).await?;
        v.into_iter().next().ok_or(EmbedderError::EmptyResponse)
    }

    /// Embed multiple texts, one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;
}

/// Causal language model behind the inference server.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt` (only the new text, trimmed).
    async fn generate(&self, prompt: &str, params: &GenerationParams)
        -> Result<String, GenerateError>;

    /// Send text to `tx` as it is produced. The default sends the whole completion once.
    async fn stream_into(
        &self,
        prompt: &str,
        params: &GenerationParams,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<(), GenerateError> {
        let text = self.generate(prompt, params).await?;
        // A dropped receiver means nobody is reading anymore; not a generation failure.
        let _ = tx.send(text);
        Ok(())
    }
}

/// Something that answers a question: vector RAG, GraphRAG, or a canned stand-in.
#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> &str;

    async fn respond(&self, query: &str) -> Result<RagAnswer, PipelineError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("graph store connection error: {0}")]
    Connection(String),
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("graph store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum VecStoreError {
    #[error("vector store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("embedder error: {0}")]
    Other(String),
    #[error("empty response")]
    EmptyResponse,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("empty response")]
    EmptyResponse,
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamError),
    #[error("generation error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("extraction API error: {0}")]
    Api(String),
    #[error("invalid extraction response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("embedder: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("graph: {0}")]
    Graph(#[from] GraphStoreError),
    #[error("vector: {0}")]
    Vec(#[from] VecStoreError),
    #[error("generation: {0}")]
    Generate(#[from] GenerateError),
    #[error("extraction: {0}")]
    Extract(#[from] ExtractError),
    #[error("pipeline error: {0}")]
    Other(String),
}
