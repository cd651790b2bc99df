//! The small people/projects knowledge graph used by the graph demo and GraphRAG examples.

use rag_types::{GraphNode, GraphRelationship, GraphStore, GraphStoreError, Triple};

/// `(subject name, relationship, object name)` of the demo graph.
pub const DEMO_RELATIONSHIPS: [(&str, &str, &str); 3] = [
    ("Alice", "WORKS_ON", "Project X"),
    ("Bob", "MANAGES", "Project X"),
    ("Bob", "MANAGES", "Project Y"),
];

pub fn demo_nodes() -> Vec<GraphNode> {
    vec![
        GraphNode::new("Person", "Alice").with_property("role", "Engineer"),
        GraphNode::new("Person", "Bob").with_property("role", "Manager"),
        GraphNode::new("Project", "Project X").with_property("deadline", "2024-12-31"),
        GraphNode::new("Project", "Project Y").with_property("deadline", "2025-06-30"),
    ]
}

pub fn demo_relationships() -> Vec<GraphRelationship> {
    let nodes = demo_nodes();
    let by_name = |name: &str| nodes.iter().find(|n| n.name == name);
    DEMO_RELATIONSHIPS
        .iter()
        .filter_map(|&(from, rel, to)| {
            Some(GraphRelationship::new(by_name(from)?, rel, by_name(to)?))
        })
        .collect()
}

/// Wipe the store, then create the demo nodes and relationships.
pub async fn load_demo_graph(store: &dyn GraphStore) -> Result<(), GraphStoreError> {
    store.clear().await?;
    store.upsert_nodes(&demo_nodes()).await?;
    store.add_relationships(&demo_relationships()).await?;
    let stats = store.stats().await?;
    tracing::info!(
        nodes = stats.nodes,
        relationships = stats.relationships,
        "demo graph created"
    );
    Ok(())
}

/// People working on projects, one `(worker, project)` row each.
pub async fn workers(store: &dyn GraphStore) -> Result<Vec<Triple>, GraphStoreError> {
    store.find_pattern("Person", "WORKS_ON", "Project").await
}

/// The worker query as display lines, header first.
pub async fn worker_lines(store: &dyn GraphStore) -> Result<Vec<String>, GraphStoreError> {
    let mut lines = vec!["People working on projects:".to_string()];
    for row in workers(store).await? {
        lines.push(format!("{} is working on {}", row.subject.name, row.object.name));
    }
    Ok(lines)
}
