pub mod compare;
pub mod generate;
pub mod graph;
pub mod vector;

use anyhow::{anyhow, Result};
use rag_embed::{ChatClient, OpenAiChatClient, OpenAiEmbedder};
use rag_graph::{GraphStore, InMemoryGraphStore, Neo4jGraphStore};
use rag_pipeline::{RagConfig, VectorRag};
use std::sync::Arc;

/// Neo4j when NEO4J_PASSWORD is set, otherwise an empty in-memory graph.
/// The flag tells whether the graph outlives this process.
async fn graph_store() -> Result<(Arc<dyn GraphStore>, bool)> {
    if std::env::var("NEO4J_PASSWORD").is_ok() {
        Ok((Arc::new(Neo4jGraphStore::from_env().await?), true))
    } else {
        tracing::warn!("NEO4J_PASSWORD not set, using an in-memory graph");
        Ok((Arc::new(InMemoryGraphStore::new()), false))
    }
}

fn chat() -> Option<Arc<dyn ChatClient>> {
    OpenAiChatClient::from_env().map(|c| Arc::new(c) as Arc<dyn ChatClient>)
}

fn require_chat() -> Result<Arc<dyn ChatClient>> {
    chat().ok_or_else(|| {
        anyhow!("Required environment variables not found: set LLM_API_KEY or OPENAI_API_KEY")
    })
}

/// Vector RAG over Qdrant when QDRANT_URL is set, otherwise the store in the data directory.
fn vector_rag(config: &RagConfig, collection: &str) -> Result<VectorRag> {
    let store = rag_vec::open_store(config.qdrant_url.as_deref(), &config.data_dir, collection)?;
    Ok(VectorRag::new(
        store,
        Arc::new(OpenAiEmbedder::from_env()),
        collection,
    )
    .with_top_k(config.top_k))
}
