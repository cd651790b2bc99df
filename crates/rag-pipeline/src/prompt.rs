//! Prompt construction for the instruct model and for the chat-based RAG answers.

use rag_embed::ChatMessage;

pub const DEFAULT_INSTRUCTION: &str =
    "You're a helpful assistant. Return only the answer to the question.";

pub const RAG_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Use the provided context to answer the user's question. If the context doesn't contain relevant information, say so.";

pub const GRAPH_RAG_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Answer the user's question using only the facts from the knowledge graph. Each fact has the form `subject -[RELATIONSHIP]-> object`. If the facts don't contain relevant information, say so.";

/// Llama-3 instruct prompt: system instruction, user turn, then the open assistant header.
pub fn llama3_prompt(instruction: &str, question: &str) -> String {
    format!(
        "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{}<|eot_id|><|start_header_id|>user<|end_header_id|>\n\n{}<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n",
        instruction.trim(),
        question.trim()
    )
}

pub fn rag_messages(query: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(RAG_SYSTEM_PROMPT),
        ChatMessage::user(format!("Context:\n{}\n\nQuestion: {}", context, query)),
    ]
}

pub fn graph_rag_messages(question: &str, facts: &[String]) -> Vec<ChatMessage> {
    let facts = if facts.is_empty() {
        "(no matching facts)".to_string()
    } else {
        facts
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n")
    };
    vec![
        ChatMessage::system(GRAPH_RAG_SYSTEM_PROMPT),
        ChatMessage::user(format!("Facts:\n{}\n\nQuestion: {}", facts, question)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llama3_template_ends_with_assistant_header() {
        let p = llama3_prompt(DEFAULT_INSTRUCTION, "What is the tallest building in the world?");
        assert!(p.starts_with("<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\nYou're a helpful assistant."));
        assert!(p.contains("user<|end_header_id|>\n\nWhat is the tallest building in the world?<|eot_id|>"));
        assert!(p.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
    }

    #[test]
    fn rag_user_message_layout() {
        let m = rag_messages("Who?", "ctx one\n\nctx two");
        assert_eq!(m[0].content, RAG_SYSTEM_PROMPT);
        assert_eq!(m[1].content, "Context:\nctx one\n\nctx two\n\nQuestion: Who?");
    }

    #[test]
    fn graph_facts_are_bulleted() {
        let m = graph_rag_messages("Who?", &["Alice -[WORKS_ON]-> Project X".to_string()]);
        assert_eq!(m[1].content, "Facts:\n- Alice -[WORKS_ON]-> Project X\n\nQuestion: Who?");
        let empty = graph_rag_messages("Who?", &[]);
        assert!(empty[1].content.contains("(no matching facts)"));
    }
}
