//! GraphRAG: build a knowledge graph from text, answer questions from its facts.

use crate::chunker::{
    chunk_text, list_files, read_document, IngestReport, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP,
};
use crate::prompt::graph_rag_messages;
use rag_embed::{ChatClient, ChatOptions, TripleExtractor};
use rag_graph::load_demo_graph;
use rag_types::{
    GraphNode, GraphRelationship, GraphStats, GraphStore, PipelineError, RagAnswer, Responder,
    Triple,
};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "him", "his", "how", "its", "who", "whom", "what",
    "when", "where", "which", "why", "with", "does", "did", "doing", "from", "that", "this",
    "these", "those", "they", "them", "their", "there", "then", "than", "into", "onto", "about",
    "over", "under", "some", "such", "only", "own", "same", "too", "very", "just", "also",
    "tell", "give", "show", "list", "please", "know", "working", "works", "work", "being",
    "been", "were", "will", "would", "should", "could", "may", "might", "must", "shall",
];

/// Lower-cased alphanumeric tokens of three or more characters that are not stop words,
/// in first-seen order.
pub fn keywords(question: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    question
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Counts from ingesting one text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphIngest {
    pub chunks: usize,
    pub triples: usize,
}

pub struct GraphRag {
    graph: Arc<dyn GraphStore>,
    extractor: Option<Arc<dyn TripleExtractor>>,
    chat: Option<Arc<dyn ChatClient>>,
    max_facts: usize,
    nodes_per_keyword: usize,
    options: ChatOptions,
}

impl GraphRag {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self {
            graph,
            extractor: None,
            chat: None,
            max_facts: 20,
            nodes_per_keyword: 5,
            options: ChatOptions::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TripleExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_max_facts(mut self, max_facts: usize) -> Self {
        self.max_facts = max_facts;
        self
    }

    pub fn graph(&self) -> &Arc<dyn GraphStore> {
        &self.graph
    }

    /// Replace the graph with the people/projects demo.
    pub async fn load_demo(&self) -> Result<GraphStats, PipelineError> {
        load_demo_graph(self.graph.as_ref()).await?;
        Ok(self.graph.stats().await?)
    }

    /// Extract triples from `text` chunk by chunk and merge them into the graph,
    /// tagging nodes and relationships with `source`.
    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<GraphIngest, PipelineError> {
        let extractor = self.extractor.as_ref().ok_or_else(|| {
            PipelineError::Config("no triple extractor configured (set LLM_API_KEY)".to_string())
        })?;
        let chunks = chunk_text(text, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP)?;
        let mut stats = GraphIngest {
            chunks: chunks.len(),
            triples: 0,
        };
        for chunk in &chunks {
            let triples = extractor.extract(chunk).await?;
            if triples.is_empty() {
                continue;
            }
            // Endpoints first so every relationship finds its nodes.
            let mut nodes: BTreeMap<String, GraphNode> = BTreeMap::new();
            let mut rels: Vec<GraphRelationship> = Vec::with_capacity(triples.len());
            for triple in triples {
                let (subject, rel, object) = triple.into_graph();
                rels.push(rel.with_property("source", source));
                for node in [subject, object] {
                    nodes
                        .entry(node.id.clone())
                        .or_insert_with(|| node.with_property("source", source));
                }
            }
            let nodes: Vec<GraphNode> = nodes.into_values().collect();
            self.graph.upsert_nodes(&nodes).await?;
            self.graph.add_relationships(&rels).await?;
            stats.triples += rels.len();
        }
        tracing::info!(
            source,
            chunks = stats.chunks,
            triples = stats.triples,
            "ingested text into graph"
        );
        Ok(stats)
    }

    /// Ingest every `*.txt`, `*.md` and `*.pdf` file in `dir`, in name order.
    /// Files that cannot be read are reported as skipped.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport, PipelineError> {
        let files = list_files(dir, &["txt", "md", "pdf"]).await?;
        let mut report = IngestReport::default();
        for file in files {
            let text = match read_document(&file).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "could not read file");
                    report.skipped.push(file);
                    continue;
                }
            };
            let stats = self.ingest_text(&file.to_string_lossy(), &text).await?;
            if stats.triples == 0 {
                tracing::warn!(file = %file.display(), "no facts extracted");
                report.skipped.push(file);
            } else {
                report.files.push((file, stats.triples));
            }
        }
        Ok(report)
    }

    /// Facts around the nodes the question mentions, de-duplicated and capped at `max_facts`.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Triple>, PipelineError> {
        let mut seen_nodes = HashSet::new();
        let mut seen_facts = HashSet::new();
        let mut facts = Vec::new();
        'keywords: for keyword in keywords(question) {
            for node in self
                .graph
                .search_nodes(&keyword, self.nodes_per_keyword)
                .await?
            {
                if !seen_nodes.insert(node.id.clone()) {
                    continue;
                }
                for triple in self.graph.relationships_of(&node.id, self.max_facts).await? {
                    let key = (
                        triple.subject.id.clone(),
                        triple.predicate.clone(),
                        triple.object.id.clone(),
                    );
                    if seen_facts.insert(key) {
                        facts.push(triple);
                        if facts.len() >= self.max_facts {
                            break 'keywords;
                        }
                    }
                }
            }
        }
        tracing::debug!(question, facts = facts.len(), "retrieved graph facts");
        Ok(facts)
    }

    /// Retrieved facts rendered as `subject -[REL]-> object`.
    pub async fn context(&self, question: &str) -> Result<Vec<String>, PipelineError> {
        Ok(self
            .retrieve(question)
            .await?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    pub async fn answer(&self, question: &str) -> Result<RagAnswer, PipelineError> {
        let chat = self.chat.as_ref().ok_or_else(|| {
            PipelineError::Config("no chat model configured (set LLM_API_KEY)".to_string())
        })?;
        let context = self.context(question).await?;
        let messages = graph_rag_messages(question, &context);
        let answer = chat.complete_with_messages(&messages, &self.options).await?;
        Ok(RagAnswer { answer, context })
    }
}

#[async_trait::async_trait]
impl Responder for GraphRag {
    fn name(&self) -> &str {
        "GraphRAG"
    }

    async fn respond(&self, query: &str) -> Result<RagAnswer, PipelineError> {
        self.answer(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_embed::{MockChatClient, StaticTripleExtractor};
    use rag_graph::InMemoryGraphStore;
    use rag_types::ExtractedTriple;

    fn triple(s: &str, st: &str, p: &str, o: &str, ot: &str) -> ExtractedTriple {
        ExtractedTriple {
            subject: s.to_string(),
            subject_type: st.to_string(),
            predicate: p.to_string(),
            object: o.to_string(),
            object_type: ot.to_string(),
        }
    }

    #[test]
    fn keywords_skip_short_and_stop_words() {
        assert_eq!(
            keywords("Who is working on Project X? Who manages project-x?"),
            vec!["project", "manages"]
        );
        assert_eq!(keywords("What does Alice do?"), vec!["alice"]);
    }

    #[tokio::test]
    async fn demo_facts_for_alice() {
        let rag = GraphRag::new(Arc::new(InMemoryGraphStore::new()));
        let stats = rag.load_demo().await.unwrap();
        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.relationships, 3);

        let facts = rag.context("What does Alice do?").await.unwrap();
        assert_eq!(facts, vec!["Alice -[WORKS_ON]-> Project X".to_string()]);
    }

    #[tokio::test]
    async fn facts_are_deduplicated_and_capped() {
        let rag = GraphRag::new(Arc::new(InMemoryGraphStore::new()));
        rag.load_demo().await.unwrap();
        // "bob" and "project" reach the same MANAGES edges.
        let facts = rag.retrieve("bob project").await.unwrap();
        assert_eq!(facts.len(), 3);

        let capped = GraphRag::new(rag.graph().clone()).with_max_facts(2);
        assert_eq!(capped.retrieve("bob project").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn ingest_text_merges_extracted_triples() {
        let extractor = Arc::new(StaticTripleExtractor::new(vec![
            triple("Rust", "Language", "created by", "Graydon Hoare", "Person"),
            triple("Mozilla", "Organization", "SPONSORED", "Rust", "Language"),
            triple("Go", "Language", "CREATED_BY", "Google", "Organization"),
        ]));
        let rag = GraphRag::new(Arc::new(InMemoryGraphStore::new())).with_extractor(extractor);
        let stats = rag
            .ingest_text("notes.txt", "Rust was created by Graydon Hoare and sponsored by Mozilla.")
            .await
            .unwrap();
        assert_eq!(stats, GraphIngest { chunks: 1, triples: 2 });

        let graph_stats = rag.graph().stats().await.unwrap();
        assert_eq!(graph_stats.nodes, 3);
        assert_eq!(graph_stats.relationships, 2);

        let node = rag.graph().get_node("person:graydon hoare").await.unwrap().unwrap();
        assert_eq!(node.properties["source"], "notes.txt");

        let facts = rag.context("Who created Rust?").await.unwrap();
        assert!(facts.contains(&"Rust -[CREATED_BY]-> Graydon Hoare".to_string()));
        assert!(facts.contains(&"Mozilla -[SPONSORED]-> Rust".to_string()));
    }

    #[tokio::test]
    async fn ingest_dir_reads_text_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.md"), "Alice works on Apollo.").await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "Nothing relevant.").await.unwrap();
        let extractor = Arc::new(StaticTripleExtractor::new(vec![triple(
            "Alice", "Person", "WORKS_ON", "Apollo", "Project",
        )]));
        let rag = GraphRag::new(Arc::new(InMemoryGraphStore::new())).with_extractor(extractor);
        let report = rag.ingest_dir(dir.path()).await.unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[tokio::test]
    async fn ingest_dir_reads_pdfs_and_skips_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), [0xff, 0xfe, 0x00]).await.unwrap();
        let pdf = crate::chunker::pdf_with_text("Alice works on Apollo");
        tokio::fs::write(dir.path().join("b.pdf"), pdf).await.unwrap();
        tokio::fs::write(dir.path().join("c.pdf"), b"%PDF-1.4 truncated").await.unwrap();
        tokio::fs::write(dir.path().join("d.md"), "Bob manages Zeus.").await.unwrap();
        let extractor = Arc::new(StaticTripleExtractor::new(vec![
            triple("Alice", "Person", "WORKS_ON", "Apollo", "Project"),
            triple("Bob", "Person", "MANAGES", "Zeus", "Project"),
        ]));
        let rag = GraphRag::new(Arc::new(InMemoryGraphStore::new())).with_extractor(extractor);
        let report = rag.ingest_dir(dir.path()).await.unwrap();

        let ingested: Vec<_> = report
            .files
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(ingested, vec!["b.pdf", "d.md"]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(rag.graph().stats().await.unwrap().relationships, 2);
        let node = rag.graph().get_node("person:alice").await.unwrap().unwrap();
        assert!(node.properties["source"].ends_with("b.pdf"));
    }

    #[tokio::test]
    async fn answer_passes_facts_to_chat() {
        let chat = Arc::new(MockChatClient::new("Alice"));
        let rag = GraphRag::new(Arc::new(InMemoryGraphStore::new())).with_chat(chat.clone());
        rag.load_demo().await.unwrap();
        let out = rag.respond("Who is on Project X?").await.unwrap();
        assert_eq!(out.answer, "Alice");
        assert!(!out.context.is_empty());
        let calls = chat.calls();
        assert!(calls[0].0[1].content.contains("- Alice -[WORKS_ON]-> Project X"));
    }

    #[tokio::test]
    async fn ingest_without_extractor_is_config_error() {
        let rag = GraphRag::new(Arc::new(InMemoryGraphStore::new()));
        assert!(matches!(
            rag.ingest_text("x", "text").await,
            Err(PipelineError::Config(_))
        ));
    }
}
