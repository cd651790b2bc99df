//! Qdrant-backed vector store (requires feature "qdrant").
//!
//! Qdrant point ids must be UUIDs or integers, so item ids such as `doc1` or
//! `notes.txt_3` are mapped to UUIDv5 and the original id is kept in the payload.

use crate::DEFAULT_COLLECTION;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, vectors_output::VectorsOptions, Condition,
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use rag_types::{VecSearchHit, VecStore, VecStoreError, VecStoreItem};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const ID_KEY: &str = "_item_id";
const DOCUMENT_KEY: &str = "_document";

fn point_uuid(id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
}

fn point_id(id: &str) -> PointId {
    PointId::from(point_uuid(id))
}

fn to_json(v: &qdrant_client::qdrant::Value) -> serde_json::Value {
    match v.kind.as_ref() {
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::IntegerValue(i)) => serde_json::Value::Number((*i).into()),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        _ => serde_json::Value::Null,
    }
}

/// Split a stored payload back into (item id, document, metadata).
fn split_payload(
    payload: HashMap<String, qdrant_client::qdrant::Value>,
    fallback_id: String,
) -> (String, String, HashMap<String, serde_json::Value>) {
    let mut metadata: HashMap<String, serde_json::Value> =
        payload.iter().map(|(k, v)| (k.clone(), to_json(v))).collect();
    let id = match metadata.remove(ID_KEY) {
        Some(serde_json::Value::String(s)) => s,
        _ => fallback_id,
    };
    let document = match metadata.remove(DOCUMENT_KEY) {
        Some(serde_json::Value::String(s)) => s,
        _ => String::new(),
    };
    (id, document, metadata)
}

fn raw_point_id(id: Option<&PointId>) -> String {
    id.and_then(|id| id.point_id_options.as_ref())
        .map(|o| match o {
            PointIdOptions::Uuid(u) => u.clone(),
            PointIdOptions::Num(n) => n.to_string(),
        })
        .unwrap_or_default()
}

fn build_filter(filter: &HashMap<String, serde_json::Value>) -> Result<Filter, VecStoreError> {
    let mut conditions = Vec::with_capacity(filter.len());
    for (k, v) in filter {
        let condition = match v {
            serde_json::Value::String(s) => Condition::matches(k.clone(), s.clone()),
            serde_json::Value::Bool(b) => Condition::matches(k.clone(), *b),
            serde_json::Value::Number(n) if n.is_i64() => {
                Condition::matches(k.clone(), n.as_i64().unwrap_or_default())
            }
            other => {
                return Err(VecStoreError::Other(format!(
                    "unsupported filter value for {}: {}",
                    k, other
                )))
            }
        };
        conditions.push(condition);
    }
    Ok(Filter::must(conditions))
}

/// Qdrant-backed implementation of VecStore.
pub struct QdrantVecStore {
    client: Arc<Qdrant>,
    collection: String,
}

impl QdrantVecStore {
    pub fn new(url: &str, collection: Option<&str>) -> Result<Self, VecStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VecStoreError::Other(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            collection: collection.unwrap_or(DEFAULT_COLLECTION).to_string(),
        })
    }

    pub fn from_env(collection: Option<&str>) -> Result<Self, VecStoreError> {
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string());
        Self::new(&url, collection)
    }

    fn collection(&self, override_name: Option<&str>) -> String {
        override_name.unwrap_or(&self.collection).to_string()
    }

    async fn exists(&self, coll: &str) -> Result<bool, VecStoreError> {
        self.client
            .collection_exists(coll)
            .await
            .map_err(|e| VecStoreError::Other(e.to_string()))
    }

    /// Create the collection with cosine distance if it does not exist yet.
    pub async fn ensure_collection(&self, coll: &str, vector_size: u64) -> Result<(), VecStoreError> {
        if !self.exists(coll).await? {
            tracing::info!(collection = coll, vector_size, "creating qdrant collection");
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(coll)
                        .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
                )
                .await
                .map_err(|e| VecStoreError::Other(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl VecStore for QdrantVecStore {
    async fn add(
        &self,
        items: &[VecStoreItem],
        collection: Option<&str>,
    ) -> Result<(), VecStoreError> {
        let Some(first) = items.first() else {
            return Ok(());
        };
        let coll = self.collection(collection);
        self.ensure_collection(&coll, first.vector.len() as u64).await?;
        let mut points = Vec::with_capacity(items.len());
        for item in items {
            let mut payload_json: serde_json::Map<String, serde_json::Value> = item
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            payload_json.insert(ID_KEY.to_string(), item.id.clone().into());
            payload_json.insert(DOCUMENT_KEY.to_string(), item.document.clone().into());
            let payload = Payload::try_from(serde_json::Value::Object(payload_json))
                .map_err(|e| VecStoreError::Other(e.to_string()))?;
            points.push(PointStruct::new(
                point_uuid(&item.id),
                item.vector.clone(),
                payload,
            ));
        }
        self.client
            .upsert_points(UpsertPointsBuilder::new(coll, points).wait(true))
            .await
            .map_err(|e| VecStoreError::Other(e.to_string()))?;
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
        collection: Option<&str>,
    ) -> Result<Vec<VecSearchHit>, VecStoreError> {
        let coll = self.collection(collection);
        if !self.exists(&coll).await? {
            return Ok(Vec::new());
        }
        let mut builder = SearchPointsBuilder::new(coll, query_vector.to_vec(), top_k as u64)
            .with_payload(true);
        if let Some(f) = filter.filter(|f| !f.is_empty()) {
            builder = builder.filter(build_filter(f)?);
        }
        let result = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| VecStoreError::Other(e.to_string()))?;
        Ok(result
            .result
            .into_iter()
            .map(|p| {
                let fallback = raw_point_id(p.id.as_ref());
                let (id, document, metadata) = split_payload(p.payload, fallback);
                VecSearchHit {
                    id,
                    document,
                    metadata,
                    score: p.score as f64,
                }
            })
            .collect())
    }

    async fn get_by_ids(
        &self,
        ids: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<VecStoreItem>, VecStoreError> {
        let coll = self.collection(collection);
        if ids.is_empty() || !self.exists(&coll).await? {
            return Ok(Vec::new());
        }
        let point_ids: Vec<PointId> = ids.iter().map(|s| point_id(s)).collect();
        let resp = self
            .client
            .get_points(
                GetPointsBuilder::new(coll, point_ids)
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| VecStoreError::Other(e.to_string()))?;
        Ok(resp
            .result
            .into_iter()
            .map(|p| {
                #[allow(deprecated)]
                let vector = p
                    .vectors
                    .as_ref()
                    .and_then(|v| v.vectors_options.as_ref())
                    .and_then(|o| match o {
                        VectorsOptions::Vector(v) => Some(v.data.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                let fallback = raw_point_id(p.id.as_ref());
                let (id, document, metadata) = split_payload(p.payload, fallback);
                VecStoreItem {
                    id,
                    vector,
                    document,
                    metadata,
                }
            })
            .collect())
    }

    async fn delete(&self, ids: &[String], collection: Option<&str>) -> Result<(), VecStoreError> {
        let coll = self.collection(collection);
        if ids.is_empty() || !self.exists(&coll).await? {
            return Ok(());
        }
        let point_ids: Vec<PointId> = ids.iter().map(|s| point_id(s)).collect();
        self.client
            .delete_points(DeletePointsBuilder::new(coll).points(point_ids))
            .await
            .map_err(|e| VecStoreError::Other(e.to_string()))?;
        Ok(())
    }

    async fn count(&self, collection: Option<&str>) -> Result<usize, VecStoreError> {
        let coll = self.collection(collection);
        if !self.exists(&coll).await? {
            return Ok(0);
        }
        let resp = self
            .client
            .count(CountPointsBuilder::new(coll).exact(true))
            .await
            .map_err(|e| VecStoreError::Other(e.to_string()))?;
        Ok(resp.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn list_collections(&self) -> Result<Vec<String>, VecStoreError> {
        let resp = self
            .client
            .list_collections()
            .await
            .map_err(|e| VecStoreError::Other(e.to_string()))?;
        let mut names: Vec<String> = resp.collections.into_iter().map(|c| c.name).collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ids_are_stable_uuids() {
        assert_eq!(point_uuid("doc1"), point_uuid("doc1"));
        assert_ne!(point_uuid("doc1"), point_uuid("doc2"));
        assert!(Uuid::parse_str(&point_uuid("notes.txt_0")).is_ok());
    }

    #[test]
    fn payload_split_restores_id_and_document() {
        let payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::from([
            (ID_KEY.to_string(), "doc1".to_string().into()),
            (DOCUMENT_KEY.to_string(), "hello".to_string().into()),
            ("source".to_string(), "web".to_string().into()),
        ]);
        let (id, document, metadata) = split_payload(payload, "fallback".to_string());
        assert_eq!(id, "doc1");
        assert_eq!(document, "hello");
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["source"], "web");
    }

    #[test]
    fn unsupported_filter_values_are_rejected() {
        let f = HashMap::from([("tags".to_string(), serde_json::json!(["a"]))]);
        assert!(build_filter(&f).is_err());
    }
}
