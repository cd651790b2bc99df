use super::{require_chat, vector_rag};
use anyhow::Result;
use rag_pipeline::vector::DEMO_QUERY;
use rag_pipeline::{RagConfig, VectorRag};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub async fn seed_demo(top_k: usize) -> Result<()> {
    let config = RagConfig::from_env();
    let rag = vector_rag(&config, &config.seed_collection)?;
    if rag.is_empty().await? {
        println!("Creating new collection and adding documents...");
    } else {
        println!("Using existing collection from disk...");
    }
    rag.seed_demo().await?;

    for hit in rag.query(DEMO_QUERY, top_k).await? {
        println!("Document ID: {}", hit.id);
        println!("Distance: {}", hit.distance());
        let mut metadata: Vec<_> = hit.metadata.iter().collect();
        metadata.sort_by(|a, b| a.0.cmp(b.0));
        let metadata: Vec<String> = metadata
            .into_iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        println!("Metadata: {{{}}}", metadata.join(", "));
        println!("Content: {}", hit.document);
        println!();
    }
    Ok(())
}

async fn ingest_files(rag: &VectorRag, dir: &Path) -> Result<()> {
    let report = rag.ingest_dir(dir).await?;
    if report.is_empty() {
        println!("No .txt files found in {}", dir.display());
        return Ok(());
    }
    for (file, chunks) in &report.files {
        println!("Added {} chunks from {} to the collection.", chunks, file.display());
    }
    for file in &report.skipped {
        println!("No content extracted from {}", file.display());
    }
    println!(
        "Processed {} files ({} chunks).",
        report.files.len() + report.skipped.len(),
        report.chunks()
    );
    Ok(())
}

pub async fn ingest(dir: Option<PathBuf>) -> Result<()> {
    let config = RagConfig::from_env();
    let dir = match dir {
        Some(d) => d,
        None => config.require_text_files_path()?.clone(),
    };
    let rag = vector_rag(&config, &config.text_collection)?;
    ingest_files(&rag, &dir).await
}

fn print_answer(answer: &str) {
    println!("\nResponse: {}", textwrap::fill(answer, 100));
}

pub async fn ask(question: Option<&str>, ingest: bool) -> Result<()> {
    let config = RagConfig::from_env();
    let rag = vector_rag(&config, &config.text_collection)?.with_chat(require_chat()?);
    if ingest {
        ingest_files(&rag, config.require_text_files_path()?).await?;
    }

    if let Some(q) = question {
        print_answer(&rag.answer(q).await?.answer);
        return Ok(());
    }

    println!("\nRAG System Ready. Enter your questions (type 'exit' to quit):");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\nYour question: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if matches!(query.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }
        match rag.answer(query).await {
            Ok(answer) => print_answer(&answer.answer),
            Err(e) => print_answer(&format!("Error generating response: {}", e)),
        }
    }
    Ok(())
}
