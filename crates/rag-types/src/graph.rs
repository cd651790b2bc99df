//! Property-graph records shared by the graph stores and the GraphRAG pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label used when an extracted entity type sanitises to nothing.
pub const DEFAULT_LABEL: &str = "Entity";
/// Relationship type used when an extracted predicate sanitises to nothing.
pub const DEFAULT_REL_TYPE: &str = "RELATED_TO";

/// A labelled node with a display name and string properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl GraphNode {
    /// Build a node whose id is derived from its label and name.
    pub fn new(label: &str, name: &str) -> Self {
        let label = sanitize_label(label);
        let name = name.trim().to_string();
        Self {
            id: node_id(&label, &name),
            label,
            name,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Stable node id: `<label lowercased>:<name lowercased>`.
pub fn node_id(label: &str, name: &str) -> String {
    format!("{}:{}", label.to_lowercase(), name.trim().to_lowercase())
}

/// Keep `[A-Za-z0-9_]`; labels are spliced into Cypher and cannot be parameters.
pub fn sanitize_label(label: &str) -> String {
    let s: String = label
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if s.is_empty() {
        DEFAULT_LABEL.to_string()
    } else {
        s
    }
}

/// Upper-case and map any non-alphanumeric run to a single `_`.
pub fn sanitize_rel_type(rel_type: &str) -> String {
    let mut out = String::with_capacity(rel_type.len());
    for c in rel_type.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() {
        DEFAULT_REL_TYPE.to_string()
    } else {
        out
    }
}

/// Directed, typed relationship between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub from: String,
    pub rel_type: String,
    pub to: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl GraphRelationship {
    pub fn new(from: &GraphNode, rel_type: &str, to: &GraphNode) -> Self {
        Self {
            from: from.id.clone(),
            rel_type: sanitize_rel_type(rel_type),
            to: to.id.clone(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A resolved relationship with both endpoints, e.g. `Alice -[WORKS_ON]-> Project X`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: GraphNode,
    pub predicate: String,
    pub object: GraphNode,
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.subject.name, self.predicate, self.object.name
        )
    }
}

/// Node and relationship counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub relationships: usize,
}

/// Raw triple as produced by an extractor, before it is resolved into nodes.
///
/// Every field defaults to empty so one incomplete triple in a model reply does not
/// spoil the rest; callers drop triples with an empty subject, predicate or object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTriple {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub subject_type: String,
    #[serde(default)]
    pub predicate: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub object_type: String,
}

impl ExtractedTriple {
    /// Resolve into the two endpoint nodes and the relationship joining them.
    pub fn into_graph(self) -> (GraphNode, GraphRelationship, GraphNode) {
        let subject = GraphNode::new(&self.subject_type, &self.subject);
        let object = GraphNode::new(&self.object_type, &self.object);
        let rel = GraphRelationship::new(&subject, &self.predicate, &object);
        (subject, rel, object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_case_insensitive_on_name() {
        let a = GraphNode::new("Person", " Alice ");
        let b = GraphNode::new("Person", "alice");
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "person:alice");
        assert_eq!(a.name, "Alice");
    }

    #[test]
    fn labels_and_rel_types_are_cypher_safe() {
        assert_eq!(sanitize_label("Person`) DETACH"), "PersonDETACH");
        assert_eq!(sanitize_label("  "), DEFAULT_LABEL);
        assert_eq!(sanitize_rel_type("works on"), "WORKS_ON");
        assert_eq!(sanitize_rel_type("is-part of!"), "IS_PART_OF");
        assert_eq!(sanitize_rel_type("--"), DEFAULT_REL_TYPE);
    }

    #[test]
    fn triple_display() {
        let t = Triple {
            subject: GraphNode::new("Person", "Alice"),
            predicate: "WORKS_ON".to_string(),
            object: GraphNode::new("Project", "Project X"),
        };
        assert_eq!(t.to_string(), "Alice -[WORKS_ON]-> Project X");
    }

    #[test]
    fn extracted_triple_without_types_uses_default_label() {
        let (s, rel, o) = ExtractedTriple {
            subject: "Rust".to_string(),
            subject_type: String::new(),
            predicate: "created by".to_string(),
            object: "Graydon Hoare".to_string(),
            object_type: "Person".to_string(),
        }
        .into_graph();
        assert_eq!(s.label, DEFAULT_LABEL);
        assert_eq!(rel.rel_type, "CREATED_BY");
        assert_eq!(rel.to, o.id);
    }
}
