//! Vector-store RAG: embed documents, retrieve nearest chunks, answer with a chat model.

use crate::chunker::{list_files, read_and_chunk_file, IngestReport};
use crate::prompt::rag_messages;
use rag_embed::{ChatClient, ChatOptions};
use rag_types::{
    Document, Embedder, PipelineError, RagAnswer, Responder, VecSearchHit, VecStore, VecStoreItem,
};
use std::path::Path;
use std::sync::Arc;

/// Query used by the seed demo.
pub const DEMO_QUERY: &str = "Find information about the first document";

/// The three documents the seed demo indexes into an empty collection.
pub fn sample_documents() -> Vec<Document> {
    vec![
        Document::new("doc1", "This is the first document.").with_metadata("source", "web"),
        Document::new("doc2", "Second document content here.").with_metadata("source", "books"),
        Document::new("doc3", "Another piece of information in document three.")
            .with_metadata("source", "articles"),
    ]
}

pub struct VectorRag {
    store: Arc<dyn VecStore>,
    embedder: Arc<dyn Embedder>,
    chat: Option<Arc<dyn ChatClient>>,
    collection: String,
    top_k: usize,
    options: ChatOptions,
}

impl VectorRag {
    pub fn new(
        store: Arc<dyn VecStore>,
        embedder: Arc<dyn Embedder>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            chat: None,
            collection: collection.into(),
            top_k: 3,
            options: ChatOptions::default(),
        }
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Number of chunks used as context by [`VectorRag::answer`].
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed and store documents under their own ids.
    pub async fn add_documents(&self, docs: &[Document]) -> Result<usize, PipelineError> {
        if docs.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = docs.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        let items: Vec<VecStoreItem> = docs
            .iter()
            .zip(vectors)
            .map(|(doc, vector)| VecStoreItem {
                id: doc.id.clone(),
                vector,
                document: doc.text.clone(),
                metadata: doc.metadata.clone(),
            })
            .collect();
        self.store.add(&items, Some(&self.collection)).await?;
        tracing::info!(count = items.len(), collection = %self.collection, "added documents");
        Ok(items.len())
    }

    /// Store the chunks of one source file as `"{file name}_{i}"`.
    pub async fn add_chunks(&self, chunks: &[String], source: &str) -> Result<usize, PipelineError> {
        let base = Path::new(source)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.to_string());
        let docs: Vec<Document> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                Document::new(format!("{}_{}", base, i), chunk.clone())
                    .with_metadata("source", source)
                    .with_metadata("chunk_index", i)
            })
            .collect();
        self.add_documents(&docs).await
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<usize, PipelineError> {
        let chunks = read_and_chunk_file(path).await?;
        if chunks.is_empty() {
            return Ok(0);
        }
        let added = self.add_chunks(&chunks, &path.to_string_lossy()).await?;
        tracing::info!(file = %path.display(), chunks = added, "ingested file");
        Ok(added)
    }

    /// Ingest every `*.txt` file in `dir`, in name order. Files that cannot be read
    /// are reported as skipped; store and embedder failures abort.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport, PipelineError> {
        let files = list_files(dir, &["txt"]).await?;
        let mut report = IngestReport::default();
        for file in files {
            let chunks = match read_and_chunk_file(&file).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "could not read file");
                    report.skipped.push(file);
                    continue;
                }
            };
            if chunks.is_empty() {
                tracing::warn!(file = %file.display(), "no content extracted");
                report.skipped.push(file);
                continue;
            }
            let added = self.add_chunks(&chunks, &file.to_string_lossy()).await?;
            tracing::info!(file = %file.display(), chunks = added, "ingested file");
            report.files.push((file, added));
        }
        Ok(report)
    }

    pub async fn is_empty(&self) -> Result<bool, PipelineError> {
        Ok(self.store.count(Some(&self.collection)).await? == 0)
    }

    /// Index [`sample_documents`] unless the collection already has content.
    /// Returns whether anything was added.
    pub async fn seed_demo(&self) -> Result<bool, PipelineError> {
        if !self.is_empty().await? {
            tracing::info!(collection = %self.collection, "using existing collection");
            return Ok(false);
        }
        self.add_documents(&sample_documents()).await?;
        Ok(true)
    }

    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<VecSearchHit>, PipelineError> {
        let vector = self.embedder.embed(text).await?;
        Ok(self
            .store
            .search(&vector, top_k, None, Some(&self.collection))
            .await?)
    }

    /// Retrieved documents joined by a blank line.
    pub async fn relevant_context(&self, text: &str, top_k: usize) -> Result<String, PipelineError> {
        let hits = self.query(text, top_k).await?;
        Ok(hits
            .into_iter()
            .map(|h| h.document)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    pub async fn answer(&self, query: &str) -> Result<RagAnswer, PipelineError> {
        self.answer_with_top_k(query, self.top_k).await
    }

    pub async fn answer_with_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<RagAnswer, PipelineError> {
        let chat = self.chat.as_ref().ok_or_else(|| {
            PipelineError::Config("no chat model configured (set LLM_API_KEY)".to_string())
        })?;
        let hits = self.query(query, top_k).await?;
        let context: Vec<String> = hits.into_iter().map(|h| h.document).collect();
        let messages = rag_messages(query, &context.join("\n\n"));
        let answer = chat.complete_with_messages(&messages, &self.options).await?;
        Ok(RagAnswer { answer, context })
    }
}

#[async_trait::async_trait]
impl Responder for VectorRag {
    fn name(&self) -> &str {
        "RAG"
    }

    async fn respond(&self, query: &str) -> Result<RagAnswer, PipelineError> {
        self.answer(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_embed::{MockChatClient, MockEmbedder};
    use rag_vec::InMemoryVecStore;

    fn rag() -> VectorRag {
        VectorRag::new(
            Arc::new(InMemoryVecStore::new(None)),
            Arc::new(MockEmbedder::new()),
            "text_collection",
        )
    }

    #[tokio::test]
    async fn seed_demo_only_fills_empty_collection() {
        let rag = rag();
        assert!(rag.is_empty().await.unwrap());
        assert!(rag.seed_demo().await.unwrap());
        assert!(!rag.seed_demo().await.unwrap());

        let hits = rag.query(DEMO_QUERY, 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "doc1");
        assert_eq!(hits[0].metadata["source"], "web");
        assert!(hits[0].distance() < hits[1].distance());
    }

    #[tokio::test]
    async fn chunks_get_file_ids_and_metadata() {
        let rag = rag();
        let chunks = vec!["alpha beta".to_string(), "gamma delta".to_string()];
        rag.add_chunks(&chunks, "/data/notes.txt").await.unwrap();
        let hits = rag.query("gamma delta", 1).await.unwrap();
        assert_eq!(hits[0].id, "notes.txt_1");
        assert_eq!(hits[0].metadata["source"], "/data/notes.txt");
        assert_eq!(hits[0].metadata["chunk_index"], 1);
    }

    #[tokio::test]
    async fn ingest_dir_reports_files_and_skips_empty_ones() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "The Burj Khalifa is the tallest building.")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "   \n").await.unwrap();
        tokio::fs::write(dir.path().join("c.md"), "ignored").await.unwrap();

        let rag = rag();
        let report = rag.ingest_dir(dir.path()).await.unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.chunks(), 1);
        assert_eq!(report.skipped.len(), 1);

        let ctx = rag.relevant_context("tallest building", 3).await.unwrap();
        assert_eq!(ctx, "The Burj Khalifa is the tallest building.");
    }

    #[tokio::test]
    async fn unreadable_file_does_not_stop_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), [0xff, 0xfe, 0x00]).await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "Neural networks learn representations.")
            .await
            .unwrap();

        let rag = rag();
        let report = rag.ingest_dir(dir.path()).await.unwrap();
        assert_eq!(report.skipped, vec![dir.path().join("a.txt")]);
        assert_eq!(report.files, vec![(dir.path().join("b.txt"), 1)]);
        assert!(!rag.is_empty().await.unwrap());
        assert!(rag.ingest_file(&dir.path().join("a.txt")).await.is_err());
    }

    #[tokio::test]
    async fn answer_sends_context_to_chat() {
        let chat = Arc::new(MockChatClient::new("Burj Khalifa"));
        let rag = rag().with_chat(chat.clone()).with_top_k(2);
        rag.seed_demo().await.unwrap();

        let out = rag.respond("first document").await.unwrap();
        assert_eq!(out.answer, "Burj Khalifa");
        assert_eq!(out.context.len(), 2);

        let calls = chat.calls();
        let (messages, options) = &calls[0];
        assert_eq!(options.max_tokens, 500);
        assert!(messages[1].content.starts_with("Context:\nThis is the first document."));
        assert!(messages[1].content.ends_with("\n\nQuestion: first document"));
    }

    #[tokio::test]
    async fn answer_without_chat_is_config_error() {
        let rag = rag();
        assert!(matches!(
            rag.answer("x").await,
            Err(PipelineError::Config(_))
        ));
    }
}
