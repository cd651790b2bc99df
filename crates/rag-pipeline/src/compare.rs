//! Side-by-side comparison of two responders on the same query.

use rag_types::{CompareResponse, Panel, PipelineError, RagAnswer, Responder};
use std::sync::Arc;

pub const RAG_TITLE: &str = "RAG Response";
pub const GRAPH_RAG_TITLE: &str = "GraphRAG Response";

/// Runs the RAG and GraphRAG responders concurrently.
#[derive(Clone)]
pub struct Comparator {
    rag: Arc<dyn Responder>,
    graph_rag: Arc<dyn Responder>,
}

impl Comparator {
    pub fn new(rag: Arc<dyn Responder>, graph_rag: Arc<dyn Responder>) -> Self {
        Self { rag, graph_rag }
    }

    /// Placeholder responders that only echo the query.
    pub fn canned() -> Self {
        Self::new(
            Arc::new(CannedResponder::new("RAG")),
            Arc::new(CannedResponder::new("GraphRAG")),
        )
    }

    /// A failing side is reported in its panel; the other side still answers.
    pub async fn compare(&self, query: &str) -> Result<CompareResponse, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::BadRequest(
                "Please enter a query to compare.".to_string(),
            ));
        }
        let (rag, graph_rag) = tokio::join!(self.rag.respond(query), self.graph_rag.respond(query));
        Ok(CompareResponse {
            query: query.to_string(),
            rag: panel(RAG_TITLE, self.rag.name(), rag),
            graph_rag: panel(GRAPH_RAG_TITLE, self.graph_rag.name(), graph_rag),
        })
    }
}

fn panel(title: &str, name: &str, result: Result<RagAnswer, PipelineError>) -> Panel {
    match result {
        Ok(answer) => Panel {
            title: title.to_string(),
            response: answer.answer,
            context: answer.context,
            error: None,
        },
        Err(e) => {
            tracing::warn!(responder = name, error = %e, "comparison panel failed");
            Panel {
                title: title.to_string(),
                response: String::new(),
                context: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Answers `"{name}'s response to '{query}'"` without retrieving anything.
pub struct CannedResponder {
    name: String,
}

impl CannedResponder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait::async_trait]
impl Responder for CannedResponder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&self, query: &str) -> Result<RagAnswer, PipelineError> {
        Ok(RagAnswer {
            answer: format!("{}'s response to '{}'", self.name, query),
            context: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait::async_trait]
    impl Responder for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn respond(&self, _query: &str) -> Result<RagAnswer, PipelineError> {
            Err(PipelineError::Other("graph unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn canned_panels() {
        let out = Comparator::canned().compare("What is RAG?").await.unwrap();
        assert_eq!(out.rag.title, "RAG Response");
        assert_eq!(out.rag.response, "RAG's response to 'What is RAG?'");
        assert_eq!(out.graph_rag.title, "GraphRAG Response");
        assert_eq!(out.graph_rag.response, "GraphRAG's response to 'What is RAG?'");
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        match Comparator::canned().compare("   ").await {
            Err(PipelineError::BadRequest(msg)) => assert_eq!(msg, "Please enter a query to compare."),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn one_failing_side_keeps_the_other() {
        let cmp = Comparator::new(Arc::new(CannedResponder::new("RAG")), Arc::new(Broken));
        let out = cmp.compare("q").await.unwrap();
        assert!(out.rag.error.is_none());
        assert_eq!(out.rag.response, "RAG's response to 'q'");
        assert_eq!(
            out.graph_rag.error.as_deref(),
            Some("pipeline error: graph unavailable")
        );
        assert!(out.graph_rag.response.is_empty());
    }
}
