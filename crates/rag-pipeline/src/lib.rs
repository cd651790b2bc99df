//! RAG and GraphRAG pipelines over the store and model traits.
//!
//! * [`VectorRag`]: chunk, embed, and index documents; answer from the nearest chunks.
//! * [`GraphRag`]: extract triples into a graph; answer from the facts around the question.
//! * [`Comparator`]: run both on one query, side by side.

pub mod chunker;
pub mod compare;
pub mod config;
pub mod graph_rag;
pub mod prompt;
pub mod stream;
pub mod vector;

pub use chunker::{chunk_text, read_and_chunk_file, IngestReport};
pub use compare::{CannedResponder, Comparator};
pub use config::RagConfig;
pub use graph_rag::{GraphIngest, GraphRag};
pub use stream::{spawn_generation, GenerationStream};
pub use vector::{sample_documents, VectorRag};
