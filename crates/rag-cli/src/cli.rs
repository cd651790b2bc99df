use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rag: vector RAG, GraphRAG, and local-model demos from the command line
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Vector RAG, GraphRAG, and local-model demos from the command line"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the people/projects demo graph and list who works on what
    GraphDemo,

    /// Extract knowledge-graph triples from every .txt/.md/.pdf file in a directory
    GraphIngest {
        /// Directory of documents
        dir: PathBuf,
    },

    /// Answer a question from the knowledge graph
    GraphAsk {
        question: String,

        /// Ingest this directory into the graph first
        #[arg(long)]
        ingest: Option<PathBuf>,
    },

    /// Index three sample documents (once) and run the sample query
    SeedDemo {
        /// Number of results to show
        #[arg(long, default_value = "2")]
        top_k: usize,
    },

    /// Chunk and index every .txt file in TEXT_FILES_PATH
    Ingest {
        /// Directory to ingest instead of TEXT_FILES_PATH
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Ask questions over the indexed files (interactive unless --question is given)
    Ask {
        /// One-shot question
        #[arg(long, short)]
        question: Option<String>,

        /// Ingest TEXT_FILES_PATH before answering
        #[arg(long)]
        ingest: bool,
    },

    /// Send a Llama-3 prompt to a running /generate server
    Generate {
        #[arg(default_value = "What is the tallest building in the world?")]
        question: String,

        /// System instruction
        #[arg(long)]
        instruction: Option<String>,

        /// Server URL (defaults to GENERATE_API_URL)
        #[arg(long)]
        url: Option<String>,
    },

    /// Stream a completion from the model, redrawing the text as it grows
    Stream {
        #[arg(default_value = "Qual o maior pais do mundo?")]
        prompt: String,

        #[arg(long, default_value = "150")]
        max_new_tokens: u32,

        #[arg(long, default_value = "0.7")]
        temperature: f64,
    },

    /// Show RAG and GraphRAG answers to the same query side by side
    Compare {
        query: String,

        /// Use placeholder answers instead of the real pipelines
        #[arg(long)]
        canned: bool,
    },
}
