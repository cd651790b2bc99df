//! Graph store trait, in-memory and Neo4j implementations, and the demo knowledge graph.

pub mod demo;
mod memory;

#[cfg(feature = "neo4j")]
mod neo4j;

pub use demo::{load_demo_graph, worker_lines, DEMO_RELATIONSHIPS};
pub use memory::InMemoryGraphStore;
pub use rag_types::{
    GraphNode, GraphRelationship, GraphStats, GraphStore, GraphStoreError, Triple,
};

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraphStore;
