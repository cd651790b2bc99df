//! SQLite-backed vector store: the persistent, on-disk collection directory.
//! Search loads a collection's vectors and ranks them in process.

use crate::similarity::rank;
use crate::DEFAULT_COLLECTION;
use async_trait::async_trait;
use rag_types::{VecSearchHit, VecStore, VecStoreError, VecStoreItem};
use rusqlite::types::Type;
use std::collections::HashMap;
use std::path::Path;

/// File name of the database inside the data directory.
pub const DB_FILE: &str = "vectors.sqlite3";

fn encode_vector(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn row_to_item(row: &rusqlite::Row<'_>) -> Result<VecStoreItem, rusqlite::Error> {
    let blob: Vec<u8> = row.get(1)?;
    let metadata_json: String = row.get(3)?;
    let metadata: HashMap<String, serde_json::Value> = serde_json::from_str(&metadata_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(VecStoreItem {
        id: row.get(0)?,
        vector: decode_vector(&blob),
        document: row.get(2)?,
        metadata,
    })
}

/// SQLite-backed vector store for persistence.
pub struct SqliteVecStore {
    conn: std::sync::Mutex<rusqlite::Connection>,
    default_collection: String,
}

impl SqliteVecStore {
    /// Open (or create) the store at the given database path.
    pub fn new(path: impl AsRef<Path>, default_collection: Option<&str>) -> Result<Self, VecStoreError> {
        let conn =
            rusqlite::Connection::open(path).map_err(|e| VecStoreError::Other(e.to_string()))?;
        Self::init(conn, default_collection)
    }

    /// Open the store inside a data directory, creating the directory if needed.
    pub fn open_dir(dir: impl AsRef<Path>, default_collection: Option<&str>) -> Result<Self, VecStoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| VecStoreError::Other(e.to_string()))?;
        tracing::debug!(dir = %dir.display(), "opening sqlite vector store");
        Self::new(dir.join(DB_FILE), default_collection)
    }

    pub fn in_memory(default_collection: Option<&str>) -> Result<Self, VecStoreError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| VecStoreError::Other(e.to_string()))?;
        Self::init(conn, default_collection)
    }

    fn init(conn: rusqlite::Connection, default_collection: Option<&str>) -> Result<Self, VecStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                vector BLOB NOT NULL,
                document TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            "#,
        )
        .map_err(|e| VecStoreError::Other(e.to_string()))?;

        Ok(Self {
            conn: std::sync::Mutex::new(conn),
            default_collection: default_collection.unwrap_or(DEFAULT_COLLECTION).to_string(),
        })
    }

    fn coll<'a>(&'a self, collection: Option<&'a str>) -> &'a str {
        collection.unwrap_or(&self.default_collection)
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, VecStoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| VecStoreError::Other(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(|e| VecStoreError::Other(e.to_string()))
    }
}

#[async_trait]
impl VecStore for SqliteVecStore {
    async fn add(
        &self,
        items: &[VecStoreItem],
        collection: Option<&str>,
    ) -> Result<(), VecStoreError> {
        let coll = self.coll(collection);
        let now = chrono::Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for item in items {
                let metadata_json = serde_json::to_string(&item.metadata)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                tx.execute(
                    "INSERT INTO vectors (collection, id, vector, document, metadata, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
                     ON CONFLICT(collection, id) DO UPDATE SET \
                       vector = excluded.vector, document = excluded.document, \
                       metadata = excluded.metadata, updated_at = excluded.updated_at",
                    rusqlite::params![
                        coll,
                        item.id,
                        encode_vector(&item.vector),
                        item.document,
                        metadata_json,
                        now
                    ],
                )?;
            }
            tx.commit()
        })
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
        collection: Option<&str>,
    ) -> Result<Vec<VecSearchHit>, VecStoreError> {
        let coll = self.coll(collection);
        let items = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, vector, document, metadata FROM vectors WHERE collection = ?1",
            )?;
            let rows = stmt.query_map([coll], row_to_item)?;
            rows.collect::<Result<Vec<_>, _>>()
        })?;
        Ok(rank(items, query_vector, top_k, filter))
    }

    async fn get_by_ids(
        &self,
        ids: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<VecStoreItem>, VecStoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let coll = self.coll(collection);
        let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "SELECT id, vector, document, metadata FROM vectors WHERE collection = ?1 AND id IN ({})",
            placeholders.join(",")
        );
        let mut found: HashMap<String, VecStoreItem> = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let params = std::iter::once(coll).chain(ids.iter().map(String::as_str));
                let rows = stmt.query_map(rusqlite::params_from_iter(params), row_to_item)?;
                rows.collect::<Result<Vec<_>, _>>()
            })?
            .into_iter()
            .map(|i| (i.id.clone(), i))
            .collect();
        // Keep the caller's order.
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn delete(&self, ids: &[String], collection: Option<&str>) -> Result<(), VecStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let coll = self.coll(collection);
        let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "DELETE FROM vectors WHERE collection = ?1 AND id IN ({})",
            placeholders.join(",")
        );
        self.with_conn(|conn| {
            let params = std::iter::once(coll).chain(ids.iter().map(String::as_str));
            conn.execute(&sql, rusqlite::params_from_iter(params))?;
            Ok(())
        })
    }

    async fn count(&self, collection: Option<&str>) -> Result<usize, VecStoreError> {
        let coll = self.coll(collection);
        let n: i64 = self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM vectors WHERE collection = ?1",
                [coll],
                |row| row.get(0),
            )
        })?;
        Ok(n as usize)
    }

    async fn list_collections(&self) -> Result<Vec<String>, VecStoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT collection FROM vectors ORDER BY collection")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, vector: Vec<f32>) -> VecStoreItem {
        VecStoreItem {
            id: id.to_string(),
            vector,
            document: format!("content of {id}"),
            metadata: HashMap::from([("source".to_string(), json!("web"))]),
        }
    }

    #[test]
    fn vector_blob_round_trip() {
        let v = vec![0.25_f32, -1.5, 3.0];
        assert_eq!(decode_vector(&encode_vector(&v)), v);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteVecStore::open_dir(dir.path(), Some("text_collection")).unwrap();
            store
                .add(&[item("a.txt_0", vec![1.0, 0.0]), item("a.txt_1", vec![0.0, 1.0])], None)
                .await
                .unwrap();
        }
        let store = SqliteVecStore::open_dir(dir.path(), Some("text_collection")).unwrap();
        assert_eq!(store.count(None).await.unwrap(), 2);
        let hits = store.search(&[0.1, 1.0], 1, None, None).await.unwrap();
        assert_eq!(hits[0].id, "a.txt_1");
        assert_eq!(hits[0].metadata["source"], "web");
    }

    #[tokio::test]
    async fn get_delete_and_list() {
        let store = SqliteVecStore::in_memory(None).unwrap();
        store
            .add(&[item("doc1", vec![1.0]), item("doc2", vec![1.0])], None)
            .await
            .unwrap();
        store.add(&[item("doc1", vec![1.0])], Some("other")).await.unwrap();

        let got = store
            .get_by_ids(&["doc2".to_string(), "doc1".to_string(), "nope".to_string()], None)
            .await
            .unwrap();
        let ids: Vec<&str> = got.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["doc2", "doc1"]);

        store.delete(&["doc1".to_string()], None).await.unwrap();
        assert_eq!(store.count(None).await.unwrap(), 1);
        assert_eq!(store.count(Some("other")).await.unwrap(), 1);
        assert_eq!(
            store.list_collections().await.unwrap(),
            vec![DEFAULT_COLLECTION.to_string(), "other".to_string()]
        );
    }
}
