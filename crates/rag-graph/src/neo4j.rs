//! Neo4j-backed graph store (requires feature "neo4j").
//!
//! Labels and relationship types cannot be query parameters, so they are sanitised
//! before being spliced into Cypher; everything else is passed as parameters.

use neo4rs::{query, BoltMap, BoltType, Graph, Query, Row};
use rag_types::{
    sanitize_label, sanitize_rel_type, GraphNode, GraphRelationship, GraphStats, GraphStore,
    GraphStoreError, Triple,
};
use std::collections::{BTreeMap, HashMap};

/// Columns returned for one node under a prefix, e.g. `s_id, s_label, s_name, s_props`.
fn node_columns(var: &str, prefix: &str) -> String {
    format!(
        "{var}.id AS {prefix}_id, labels({var})[0] AS {prefix}_label, \
         {var}.name AS {prefix}_name, properties({var}) AS {prefix}_props"
    )
}

fn triple_columns() -> String {
    format!(
        "{}, type(r) AS rel, {}",
        node_columns("a", "s"),
        node_columns("b", "o")
    )
}

fn props_param(props: &BTreeMap<String, String>) -> BoltType {
    let mut map = BoltMap::new();
    for (k, v) in props {
        map.put(k.as_str().into(), BoltType::from(v.clone()));
    }
    BoltType::Map(map)
}

fn node_from_row(row: &Row, prefix: &str) -> Result<GraphNode, GraphStoreError> {
    let get = |col: &str| -> Result<String, GraphStoreError> {
        row.get::<String>(&format!("{prefix}_{col}"))
            .map_err(|e| GraphStoreError::Other(format!("column {prefix}_{col}: {e}")))
    };
    // Non-string properties created outside this store are skipped.
    let mut properties: BTreeMap<String, String> = row
        .get::<HashMap<String, String>>(&format!("{prefix}_props"))
        .map(|m| m.into_iter().collect())
        .unwrap_or_default();
    properties.remove("id");
    properties.remove("name");
    Ok(GraphNode {
        id: get("id")?,
        label: get("label")?,
        name: get("name")?,
        properties,
    })
}

fn triple_from_row(row: &Row) -> Result<Triple, GraphStoreError> {
    Ok(Triple {
        subject: node_from_row(row, "s")?,
        predicate: row
            .get::<String>("rel")
            .map_err(|e| GraphStoreError::Other(e.to_string()))?,
        object: node_from_row(row, "o")?,
    })
}

/// Neo4j implementation of GraphStore over a pooled Bolt connection.
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, GraphStoreError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| GraphStoreError::Connection(e.to_string()))?;
        tracing::info!(uri, "connected to neo4j");
        Ok(Self { graph })
    }

    /// Connect using NEO4J_URI / NEO4J_USER / NEO4J_PASSWORD.
    pub async fn from_env() -> Result<Self, GraphStoreError> {
        let uri = std::env::var("NEO4J_URI").unwrap_or_else(|_| "bolt://localhost:7687".to_string());
        let user = std::env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".to_string());
        let password = std::env::var("NEO4J_PASSWORD")
            .map_err(|_| GraphStoreError::Connection("NEO4J_PASSWORD is not set".to_string()))?;
        Self::connect(&uri, &user, &password).await
    }

    async fn run(&self, q: Query) -> Result<(), GraphStoreError> {
        self.graph
            .run(q)
            .await
            .map_err(|e| GraphStoreError::Other(e.to_string()))
    }

    async fn rows(&self, q: Query) -> Result<Vec<Row>, GraphStoreError> {
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| GraphStoreError::Other(e.to_string()))?;
        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| GraphStoreError::Other(e.to_string()))?
        {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn count(&self, cypher: &str) -> Result<usize, GraphStoreError> {
        let rows = self.rows(query(cypher)).await?;
        let n = rows
            .first()
            .map(|r| r.get::<i64>("c"))
            .transpose()
            .map_err(|e| GraphStoreError::Other(e.to_string()))?
            .unwrap_or(0);
        Ok(n.max(0) as usize)
    }
}

#[async_trait::async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn clear(&self) -> Result<(), GraphStoreError> {
        self.run(query("MATCH (n) DETACH DELETE n")).await
    }

    async fn upsert_nodes(&self, nodes: &[GraphNode]) -> Result<(), GraphStoreError> {
        for node in nodes {
            let cypher = format!(
                "MERGE (n:{} {{id: $id}}) SET n.name = $name SET n += $props",
                sanitize_label(&node.label)
            );
            self.run(
                query(&cypher)
                    .param("id", node.id.clone())
                    .param("name", node.name.clone())
                    .param("props", props_param(&node.properties)),
            )
            .await?;
        }
        Ok(())
    }

    async fn add_relationships(&self, rels: &[GraphRelationship]) -> Result<(), GraphStoreError> {
        for rel in rels {
            let cypher = format!(
                "MATCH (a {{id: $from}}), (b {{id: $to}}) \
                 MERGE (a)-[r:{}]->(b) SET r += $props RETURN count(r) AS c",
                sanitize_rel_type(&rel.rel_type)
            );
            let rows = self
                .rows(
                    query(&cypher)
                        .param("from", rel.from.clone())
                        .param("to", rel.to.clone())
                        .param("props", props_param(&rel.properties)),
                )
                .await?;
            let created = rows
                .first()
                .and_then(|r| r.get::<i64>("c").ok())
                .unwrap_or(0);
            if created == 0 {
                let missing = if self.get_node(&rel.from).await?.is_none() {
                    rel.from.clone()
                } else {
                    rel.to.clone()
                };
                return Err(GraphStoreError::NodeNotFound(missing));
            }
        }
        Ok(())
    }

    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError> {
        let cypher = format!("MATCH (a {{id: $id}}) RETURN {} LIMIT 1", node_columns("a", "s"));
        let rows = self.rows(query(&cypher).param("id", id.to_string())).await?;
        rows.first().map(|r| node_from_row(r, "s")).transpose()
    }

    async fn find_pattern(
        &self,
        from_label: &str,
        rel_type: &str,
        to_label: &str,
    ) -> Result<Vec<Triple>, GraphStoreError> {
        let cypher = format!(
            "MATCH (a:{})-[r:{}]->(b:{}) RETURN {} ORDER BY a.name, b.name",
            sanitize_label(from_label),
            sanitize_rel_type(rel_type),
            sanitize_label(to_label),
            triple_columns()
        );
        self.rows(query(&cypher))
            .await?
            .iter()
            .map(triple_from_row)
            .collect()
    }

    async fn search_nodes(&self, term: &str, limit: usize) -> Result<Vec<GraphNode>, GraphStoreError> {
        let term = term.trim();
        if term.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let cypher = format!(
            "MATCH (a) WHERE a.id IS NOT NULL AND toLower(a.name) CONTAINS toLower($term) \
             RETURN {} ORDER BY a.name, a.id LIMIT $limit",
            node_columns("a", "s")
        );
        self.rows(
            query(&cypher)
                .param("term", term.to_string())
                .param("limit", limit as i64),
        )
        .await?
        .iter()
        .map(|r| node_from_row(r, "s"))
        .collect()
    }

    async fn relationships_of(
        &self,
        node_id: &str,
        limit: usize,
    ) -> Result<Vec<Triple>, GraphStoreError> {
        let cypher = format!(
            "MATCH (a {{id: $id}})-[r]->(b) RETURN {cols}, 0 AS dir, b.name AS other \
             UNION ALL \
             MATCH (a)-[r]->(b {{id: $id}}) RETURN {cols}, 1 AS dir, a.name AS other",
            cols = triple_columns()
        );
        let rows = self.rows(query(&cypher).param("id", node_id.to_string())).await?;
        let mut keyed = Vec::with_capacity(rows.len());
        for row in &rows {
            let dir = row.get::<i64>("dir").unwrap_or(0);
            let other = row.get::<String>("other").unwrap_or_default();
            let triple = triple_from_row(row)?;
            keyed.push(((dir, triple.predicate.clone(), other), triple));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(keyed.into_iter().map(|(_, t)| t).take(limit).collect())
    }

    async fn stats(&self) -> Result<GraphStats, GraphStoreError> {
        Ok(GraphStats {
            nodes: self.count("MATCH (n) RETURN count(n) AS c").await?,
            relationships: self.count("MATCH ()-[r]->() RETURN count(r) AS c").await?,
        })
    }
}
