use super::{chat, graph_store, vector_rag};
use anyhow::Result;
use rag_pipeline::{Comparator, GraphRag, RagConfig};
use rag_types::{CompareResponse, Panel};
use std::sync::Arc;

const COLUMN_WIDTH: usize = 48;
const GUTTER: &str = "  |  ";

pub async fn run(query: &str, canned: bool) -> Result<()> {
    let comparator = if canned {
        Comparator::canned()
    } else {
        let config = RagConfig::from_env();
        let (graph, persistent) = graph_store().await?;
        let mut rag = vector_rag(&config, &config.text_collection)?;
        let mut graph_rag = GraphRag::new(graph);
        if !persistent {
            graph_rag.load_demo().await?;
        }
        if let Some(chat) = chat() {
            rag = rag.with_chat(chat.clone());
            graph_rag = graph_rag.with_chat(chat);
        }
        Comparator::new(Arc::new(rag), Arc::new(graph_rag))
    };

    let res = comparator.compare(query).await?;
    print!("{}", render(&res, COLUMN_WIDTH));
    Ok(())
}

fn panel_lines(panel: &Panel, width: usize) -> Vec<String> {
    let mut lines = vec![panel.title.clone(), "=".repeat(panel.title.chars().count())];
    let body = match &panel.error {
        Some(e) => format!("Error: {}", e),
        None => panel.response.clone(),
    };
    lines.extend(textwrap::wrap(&body, width).into_iter().map(|l| l.into_owned()));
    lines
}

/// Two wrapped columns, RAG on the left and GraphRAG on the right.
fn render(res: &CompareResponse, width: usize) -> String {
    let left = panel_lines(&res.rag, width);
    let right = panel_lines(&res.graph_rag, width);
    let rows = left.len().max(right.len());
    let mut out = String::new();
    for i in 0..rows {
        let l = left.get(i).map(String::as_str).unwrap_or("");
        let r = right.get(i).map(String::as_str).unwrap_or("");
        let pad = width.saturating_sub(l.chars().count());
        let line = format!("{}{}{}{}", l, " ".repeat(pad), GUTTER, r);
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(title: &str, response: &str, error: Option<&str>) -> Panel {
        Panel {
            title: title.to_string(),
            response: response.to_string(),
            context: Vec::new(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn columns_line_up() {
        let res = CompareResponse {
            query: "q".to_string(),
            rag: panel("RAG Response", "short", None),
            graph_rag: panel("GraphRAG Response", "one two three four", None),
        };
        let out = render(&res, 12);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "RAG Response  |  GraphRAG Response");
        assert_eq!(lines[2], "short         |  one two");
        assert_eq!(lines[3], "              |  three four");
    }

    #[test]
    fn errors_are_shown_in_their_panel() {
        let res = CompareResponse {
            query: "q".to_string(),
            rag: panel("RAG Response", "", Some("no chat model")),
            graph_rag: panel("GraphRAG Response", "ok", None),
        };
        let out = render(&res, 40);
        assert!(out.lines().nth(2).unwrap().starts_with("Error: no chat model"));
    }
}
