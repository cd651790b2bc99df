mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the demo output.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Commands::GraphDemo => commands::graph::demo().await?,
        cli::Commands::GraphIngest { dir } => commands::graph::ingest(&dir).await?,
        cli::Commands::GraphAsk { question, ingest } => {
            commands::graph::ask(&question, ingest.as_deref()).await?
        }
        cli::Commands::SeedDemo { top_k } => commands::vector::seed_demo(top_k).await?,
        cli::Commands::Ingest { dir } => commands::vector::ingest(dir).await?,
        cli::Commands::Ask { question, ingest } => {
            commands::vector::ask(question.as_deref(), ingest).await?
        }
        cli::Commands::Generate {
            question,
            instruction,
            url,
        } => commands::generate::run(&question, instruction.as_deref(), url).await?,
        cli::Commands::Stream {
            prompt,
            max_new_tokens,
            temperature,
        } => commands::generate::stream(&prompt, max_new_tokens, temperature).await?,
        cli::Commands::Compare { query, canned } => commands::compare::run(&query, canned).await?,
    }

    Ok(())
}
