//! In-memory graph store with adjacency indexes.

use rag_types::{
    sanitize_label, sanitize_rel_type, GraphNode, GraphRelationship, GraphStats, GraphStore,
    GraphStoreError, Triple,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// `(from, rel_type, to)`; relationships are unique per key (MERGE semantics).
type RelKey = (String, String, String);
type EdgeIndex = HashMap<String, Vec<RelKey>>;

#[derive(Default)]
struct GraphState {
    /// node_id -> node.
    nodes: HashMap<String, GraphNode>,
    /// relationship key -> properties.
    rels: BTreeMap<RelKey, BTreeMap<String, String>>,
    /// from_node_id -> outgoing keys.
    out_index: EdgeIndex,
    /// to_node_id -> incoming keys.
    in_index: EdgeIndex,
}

impl GraphState {
    fn triple(&self, key: &RelKey) -> Option<Triple> {
        let (from, rel_type, to) = key;
        Some(Triple {
            subject: self.nodes.get(from)?.clone(),
            predicate: rel_type.clone(),
            object: self.nodes.get(to)?.clone(),
        })
    }

    fn add_to_index(index: &mut EdgeIndex, node_id: &str, key: &RelKey) {
        let list = index.entry(node_id.to_string()).or_default();
        if !list.contains(key) {
            list.push(key.clone());
        }
    }
}

/// In-memory implementation of GraphStore. Cloning shares the underlying graph.
#[derive(Clone)]
pub struct InMemoryGraphStore {
    state: Arc<RwLock<GraphState>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(GraphState::default())),
        }
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn clear(&self) -> Result<(), GraphStoreError> {
        *self.state.write().await = GraphState::default();
        Ok(())
    }

    async fn upsert_nodes(&self, nodes: &[GraphNode]) -> Result<(), GraphStoreError> {
        let mut guard = self.state.write().await;
        for node in nodes {
            match guard.nodes.get_mut(&node.id) {
                Some(existing) => {
                    existing.name = node.name.clone();
                    existing
                        .properties
                        .extend(node.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                None => {
                    guard.nodes.insert(node.id.clone(), node.clone());
                }
            }
        }
        Ok(())
    }

    async fn add_relationships(&self, rels: &[GraphRelationship]) -> Result<(), GraphStoreError> {
        if rels.is_empty() {
            return Ok(());
        }
        let mut guard = self.state.write().await;
        for rel in rels {
            for endpoint in [&rel.from, &rel.to] {
                if !guard.nodes.contains_key(endpoint) {
                    return Err(GraphStoreError::NodeNotFound(endpoint.clone()));
                }
            }
        }
        for rel in rels {
            let key: RelKey = (
                rel.from.clone(),
                sanitize_rel_type(&rel.rel_type),
                rel.to.clone(),
            );
            guard
                .rels
                .entry(key.clone())
                .or_default()
                .extend(rel.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
            GraphState::add_to_index(&mut guard.out_index, &rel.from, &key);
            GraphState::add_to_index(&mut guard.in_index, &rel.to, &key);
        }
        Ok(())
    }

    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError> {
        Ok(self.state.read().await.nodes.get(id).cloned())
    }

    async fn find_pattern(
        &self,
        from_label: &str,
        rel_type: &str,
        to_label: &str,
    ) -> Result<Vec<Triple>, GraphStoreError> {
        let from_label = sanitize_label(from_label);
        let to_label = sanitize_label(to_label);
        let rel_type = sanitize_rel_type(rel_type);
        let guard = self.state.read().await;
        let mut out: Vec<Triple> = guard
            .rels
            .keys()
            .filter(|(_, t, _)| *t == rel_type)
            .filter_map(|key| guard.triple(key))
            .filter(|t| t.subject.label == from_label && t.object.label == to_label)
            .collect();
        out.sort_by(|a, b| {
            (&a.subject.name, &a.object.name).cmp(&(&b.subject.name, &b.object.name))
        });
        Ok(out)
    }

    async fn search_nodes(&self, term: &str, limit: usize) -> Result<Vec<GraphNode>, GraphStoreError> {
        let term = term.trim().to_lowercase();
        if term.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let guard = self.state.read().await;
        let mut hits: Vec<GraphNode> = guard
            .nodes
            .values()
            .filter(|n| n.name.to_lowercase().contains(&term))
            .cloned()
            .collect();
        hits.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn relationships_of(
        &self,
        node_id: &str,
        limit: usize,
    ) -> Result<Vec<Triple>, GraphStoreError> {
        let guard = self.state.read().await;
        let collect = |index: &EdgeIndex| -> Vec<Triple> {
            index
                .get(node_id)
                .map(|keys| keys.iter().filter_map(|k| guard.triple(k)).collect())
                .unwrap_or_default()
        };
        let mut outgoing = collect(&guard.out_index);
        outgoing.sort_by(|a, b| (&a.predicate, &a.object.name).cmp(&(&b.predicate, &b.object.name)));
        let mut incoming = collect(&guard.in_index);
        incoming
            .sort_by(|a, b| (&a.predicate, &a.subject.name).cmp(&(&b.predicate, &b.subject.name)));
        Ok(outgoing.into_iter().chain(incoming).take(limit).collect())
    }

    async fn stats(&self) -> Result<GraphStats, GraphStoreError> {
        let guard = self.state.read().await;
        Ok(GraphStats {
            nodes: guard.nodes.len(),
            relationships: guard.rels.len(),
        })
    }
}
