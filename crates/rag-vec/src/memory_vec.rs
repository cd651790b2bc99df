//! In-memory vector store (brute-force KNN).

use crate::similarity::rank;
use crate::DEFAULT_COLLECTION;
use rag_types::{VecSearchHit, VecStore, VecStoreError, VecStoreItem};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory VecStore: stores items in a map, search by brute-force cosine similarity.
#[derive(Clone)]
pub struct InMemoryVecStore {
    /// collection name -> id -> item
    store: Arc<RwLock<HashMap<String, HashMap<String, VecStoreItem>>>>,
    default_collection: String,
}

impl InMemoryVecStore {
    pub fn new(default_collection: Option<&str>) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            default_collection: default_collection
                .unwrap_or(DEFAULT_COLLECTION)
                .to_string(),
        }
    }

    fn coll(&self, collection: Option<&str>) -> String {
        collection
            .unwrap_or(&self.default_collection)
            .to_string()
    }
}

impl Default for InMemoryVecStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait::async_trait]
impl VecStore for InMemoryVecStore {
    async fn add(
        &self,
        items: &[VecStoreItem],
        collection: Option<&str>,
    ) -> Result<(), VecStoreError> {
        let coll = self.coll(collection);
        let mut guard = self.store.write().await;
        let map = guard.entry(coll).or_default();
        for item in items {
            map.insert(item.id.clone(), item.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
        collection: Option<&str>,
    ) -> Result<Vec<VecSearchHit>, VecStoreError> {
        let coll = self.coll(collection);
        let guard = self.store.read().await;
        let items = guard
            .get(&coll)
            .map(|m| m.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(rank(items, query_vector, top_k, filter))
    }

    async fn get_by_ids(
        &self,
        ids: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<VecStoreItem>, VecStoreError> {
        let coll = self.coll(collection);
        let guard = self.store.read().await;
        Ok(guard
            .get(&coll)
            .map(|m| ids.iter().filter_map(|id| m.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, ids: &[String], collection: Option<&str>) -> Result<(), VecStoreError> {
        let coll = self.coll(collection);
        let mut guard = self.store.write().await;
        if let Some(m) = guard.get_mut(&coll) {
            for id in ids {
                m.remove(id);
            }
        }
        Ok(())
    }

    async fn count(&self, collection: Option<&str>) -> Result<usize, VecStoreError> {
        let coll = self.coll(collection);
        Ok(self.store.read().await.get(&coll).map_or(0, HashMap::len))
    }

    async fn list_collections(&self) -> Result<Vec<String>, VecStoreError> {
        let mut names: Vec<String> = self.store.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, vector: Vec<f32>) -> VecStoreItem {
        VecStoreItem {
            id: id.to_string(),
            vector,
            document: format!("doc {id}"),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn add_is_an_upsert() {
        let store = InMemoryVecStore::new(None);
        store.add(&[item("doc1", vec![1.0, 0.0])], None).await.unwrap();
        let mut replaced = item("doc1", vec![0.0, 1.0]);
        replaced.document = "updated".to_string();
        store.add(&[replaced], None).await.unwrap();
        assert_eq!(store.count(None).await.unwrap(), 1);
        let got = store.get_by_ids(&["doc1".to_string()], None).await.unwrap();
        assert_eq!(got[0].document, "updated");
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = InMemoryVecStore::new(Some("text_collection"));
        store.add(&[item("a", vec![1.0])], None).await.unwrap();
        store.add(&[item("b", vec![1.0])], Some("other")).await.unwrap();
        assert_eq!(store.count(Some("text_collection")).await.unwrap(), 1);
        assert_eq!(store.count(Some("missing")).await.unwrap(), 0);
        assert_eq!(
            store.list_collections().await.unwrap(),
            vec!["other".to_string(), "text_collection".to_string()]
        );
        let hits = store.search(&[1.0], 10, None, Some("other")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn delete_then_search() {
        let store = InMemoryVecStore::default();
        store
            .add(&[item("x", vec![1.0, 0.0]), item("y", vec![0.0, 1.0])], None)
            .await
            .unwrap();
        store.delete(&["x".to_string()], None).await.unwrap();
        let hits = store.search(&[1.0, 0.0], 2, None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document, "doc y");
    }
}
