//! REST API for the inference server and the RAG / GraphRAG pipelines.

pub mod server;
