//! Vector store trait with in-memory, SQLite, and Qdrant implementations.

mod memory_vec;
mod similarity;

#[cfg(feature = "qdrant")]
mod qdrant_store;
#[cfg(feature = "sqlite")]
mod sqlite_vec;

pub use memory_vec::InMemoryVecStore;
pub use rag_types::{VecSearchHit, VecStore, VecStoreError, VecStoreItem};
pub use similarity::{cosine_similarity, matches_filter, rank};

#[cfg(feature = "qdrant")]
pub use qdrant_store::QdrantVecStore;
#[cfg(feature = "sqlite")]
pub use sqlite_vec::SqliteVecStore;

/// Collection used when a call does not name one.
pub const DEFAULT_COLLECTION: &str = "my_collection";

/// Qdrant when `qdrant_url` is given, otherwise the SQLite store under `data_dir`.
#[cfg(all(feature = "sqlite", feature = "qdrant"))]
pub fn open_store(
    qdrant_url: Option<&str>,
    data_dir: &std::path::Path,
    collection: &str,
) -> Result<std::sync::Arc<dyn VecStore>, VecStoreError> {
    match qdrant_url {
        Some(url) => {
            tracing::info!(url, collection, "using qdrant vector store");
            Ok(std::sync::Arc::new(QdrantVecStore::new(url, Some(collection))?))
        }
        None => {
            tracing::info!(dir = %data_dir.display(), collection, "using sqlite vector store");
            Ok(std::sync::Arc::new(SqliteVecStore::open_dir(data_dir, Some(collection))?))
        }
    }
}

#[cfg(all(test, feature = "sqlite", feature = "qdrant"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_store_defaults_to_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(None, dir.path(), "text_collection").unwrap();
        assert_eq!(store.count(None).await.unwrap(), 0);
        assert!(dir.path().join("vectors.sqlite3").exists());
    }

    #[tokio::test]
    async fn open_store_uses_qdrant_when_url_given() {
        let dir = tempfile::tempdir().unwrap();
        // Building the client does not connect.
        assert!(open_store(Some("http://localhost:6334"), dir.path(), "c").is_ok());
        assert!(!dir.path().join("vectors.sqlite3").exists());
    }
}
