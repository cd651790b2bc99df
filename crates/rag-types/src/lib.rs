//! Core types and traits for the RAG / GraphRAG toolkit.
//!
//! Request/response DTOs mirror the JSON contracts of the inference server and the
//! comparison surface; traits describe the external services each pipeline calls.

mod dto;
mod graph;
mod traits;

pub use dto::*;
pub use graph::*;
pub use traits::*;
