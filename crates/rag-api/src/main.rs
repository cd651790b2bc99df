//! RAG API server: /generate, /rag/query, /graphrag/query, /compare.

use rag_api::server::{self, AppState};
use rag_embed::{
    ChatClient, CompletionGenerator, LlmTripleExtractor, OpenAiChatClient, OpenAiEmbedder,
};
use rag_graph::{GraphStore, InMemoryGraphStore, Neo4jGraphStore};
use rag_pipeline::{GraphRag, RagConfig, VectorRag};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let started = std::time::Instant::now();
    let config = RagConfig::from_env();

    let generator = Arc::new(CompletionGenerator::from_env());
    tracing::info!(model = generator.model(), "completion model configured");

    let vec_store = rag_vec::open_store(
        config.qdrant_url.as_deref(),
        &config.data_dir,
        &config.text_collection,
    )?;
    let mut rag = VectorRag::new(
        vec_store,
        Arc::new(OpenAiEmbedder::from_env()),
        config.text_collection.clone(),
    )
    .with_top_k(config.top_k);

    let graph: Arc<dyn GraphStore> = if std::env::var("NEO4J_PASSWORD").is_ok() {
        Arc::new(Neo4jGraphStore::from_env().await?)
    } else {
        tracing::info!("NEO4J_PASSWORD not set, using in-memory graph with demo data");
        let graph = InMemoryGraphStore::new();
        rag_graph::load_demo_graph(&graph).await?;
        Arc::new(graph)
    };
    let mut graph_rag = GraphRag::new(graph);

    match OpenAiChatClient::from_env() {
        Some(chat) => {
            let chat: Arc<dyn ChatClient> = Arc::new(chat);
            rag = rag.with_chat(chat.clone());
            graph_rag = graph_rag
                .with_chat(chat.clone())
                .with_extractor(Arc::new(LlmTripleExtractor::new(chat)));
        }
        None => tracing::warn!("LLM_API_KEY not set; /rag/query and /graphrag/query will fail"),
    }

    let state = Arc::new(AppState::new(
        generator,
        Arc::new(rag),
        Arc::new(graph_rag),
    ));
    let app = server::router(state);

    tracing::info!("Init complete");
    tracing::info!(
        "Initialization time = {:.3}s",
        started.elapsed().as_secs_f64()
    );

    let addr: SocketAddr = config.listen.parse()?;
    tracing::info!("RAG API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
