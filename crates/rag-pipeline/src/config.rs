//! Environment-driven settings shared by the server and the CLI.

use rag_types::PipelineError;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./chroma_db";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:5000";
/// Collection filled by the seed demo.
pub const SEED_COLLECTION: &str = "my_collection";
/// Collection filled by file ingestion.
pub const TEXT_COLLECTION: &str = "text_collection";

#[derive(Debug, Clone, PartialEq)]
pub struct RagConfig {
    /// Directory holding the persistent vector store.
    pub data_dir: PathBuf,
    /// Directory of documents to ingest (TEXT_FILES_PATH).
    pub text_files_path: Option<PathBuf>,
    pub listen: String,
    pub seed_collection: String,
    pub text_collection: String,
    pub top_k: usize,
    /// Qdrant endpoint; when set it replaces the on-disk store.
    pub qdrant_url: Option<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            text_files_path: None,
            listen: DEFAULT_LISTEN.to_string(),
            seed_collection: SEED_COLLECTION.to_string(),
            text_collection: TEXT_COLLECTION.to_string(),
            top_k: 3,
            qdrant_url: None,
        }
    }
}

impl RagConfig {
    /// Read RAG_DATA_DIR, TEXT_FILES_PATH, RAG_LISTEN, RAG_TOP_K and QDRANT_URL.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            data_dir: non_empty("RAG_DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            text_files_path: non_empty("TEXT_FILES_PATH").map(PathBuf::from),
            listen: non_empty("RAG_LISTEN").unwrap_or(d.listen),
            top_k: non_empty("RAG_TOP_K")
                .and_then(|v| v.trim().parse().ok())
                .filter(|k| *k > 0)
                .unwrap_or(d.top_k),
            qdrant_url: non_empty("QDRANT_URL"),
            ..d
        }
    }

    /// The ingestion directory, which file ingestion cannot run without.
    pub fn require_text_files_path(&self) -> Result<&PathBuf, PipelineError> {
        self.text_files_path.as_ref().ok_or_else(|| {
            PipelineError::Config("Required environment variable TEXT_FILES_PATH not found".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset() {
        let cfg = RagConfig::from_lookup(|_| None);
        assert_eq!(cfg, RagConfig::default());
        assert_eq!(cfg.data_dir, PathBuf::from("./chroma_db"));
        assert!(cfg.require_text_files_path().is_err());
    }

    #[test]
    fn reads_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RAG_DATA_DIR", "/var/lib/rag"),
            ("TEXT_FILES_PATH", "/docs"),
            ("RAG_LISTEN", "127.0.0.1:8080"),
            ("RAG_TOP_K", "oops"),
            ("QDRANT_URL", "http://qdrant:6334"),
        ]);
        let cfg = RagConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/rag"));
        assert_eq!(cfg.require_text_files_path().unwrap(), &PathBuf::from("/docs"));
        assert_eq!(cfg.listen, "127.0.0.1:8080");
        assert_eq!(cfg.top_k, 3);
        assert_eq!(cfg.qdrant_url.as_deref(), Some("http://qdrant:6334"));
    }

    #[test]
    fn blank_qdrant_url_keeps_local_store() {
        let cfg = RagConfig::from_lookup(|k| (k == "QDRANT_URL").then(|| "  ".to_string()));
        assert!(cfg.qdrant_url.is_none());
    }
}
