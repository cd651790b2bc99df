use super::{graph_store, require_chat};
use anyhow::Result;
use rag_embed::LlmTripleExtractor;
use rag_graph::{load_demo_graph, worker_lines};
use rag_pipeline::GraphRag;
use std::path::Path;
use std::sync::Arc;

pub async fn demo() -> Result<()> {
    let (graph, _) = graph_store().await?;
    println!("Creating the graph...");
    load_demo_graph(graph.as_ref()).await?;
    println!("Querying the graph...");
    for line in worker_lines(graph.as_ref()).await? {
        println!("{}", line);
    }
    Ok(())
}

async fn ingest_into(rag: &GraphRag, dir: &Path) -> Result<()> {
    let report = rag.ingest_dir(dir).await?;
    if report.is_empty() {
        println!("No .txt, .md or .pdf files found in {}", dir.display());
        return Ok(());
    }
    for (file, triples) in &report.files {
        println!("Added {} facts from {}", triples, file.display());
    }
    for file in &report.skipped {
        println!("No facts extracted from {}", file.display());
    }
    let stats = rag.graph().stats().await?;
    println!(
        "Graph now has {} nodes and {} relationships.",
        stats.nodes, stats.relationships
    );
    Ok(())
}

pub async fn ingest(dir: &Path) -> Result<()> {
    let (graph, persistent) = graph_store().await?;
    if !persistent {
        tracing::warn!("the in-memory graph is discarded on exit; use graph-ask --ingest to query it");
    }
    let chat = require_chat()?;
    let rag = GraphRag::new(graph).with_extractor(Arc::new(LlmTripleExtractor::new(chat)));
    ingest_into(&rag, dir).await
}

pub async fn ask(question: &str, ingest: Option<&Path>) -> Result<()> {
    let (graph, persistent) = graph_store().await?;
    let chat = require_chat()?;
    let rag = GraphRag::new(graph)
        .with_chat(chat.clone())
        .with_extractor(Arc::new(LlmTripleExtractor::new(chat)));
    match ingest {
        Some(dir) => ingest_into(&rag, dir).await?,
        None if !persistent => {
            rag.load_demo().await?;
        }
        None => {}
    }
    let answer = rag.answer(question).await?;
    if answer.context.is_empty() {
        println!("No matching facts in the graph.");
    } else {
        println!("Facts:");
        for fact in &answer.context {
            println!("  {}", fact);
        }
    }
    println!("\nAnswer: {}", textwrap::fill(&answer.answer, 100));
    Ok(())
}
