//! Prompt assembly for retrieval and direct chat.

use super::types::SearchResult;
use crate::llm::ChatMessage;

pub const RAG_SYSTEM_PROMPT: &str = "You are a knowledgeable assistant. Answer the user's question using the \
provided context. If the context does not contain the information needed, say so plainly.";

pub const DIRECT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Numbers each retrieved document as `[Document i]`, starting at 1.
pub fn label_sources(sources: &[SearchResult]) -> Vec<String> {
    sources
        .iter()
        .enumerate()
        .map(|(i, result)| format!("[Document {}] {}", i + 1, result.document.content))
        .collect()
}

pub fn build_rag_prompt(question: &str, contexts: &[String]) -> String {
    let mut prompt = String::from("Answer the question based on the following context.\n\n");
    prompt.push_str("[Context]\n");
    prompt.push_str(&contexts.join("\n\n"));
    prompt.push_str("\n\n[Question]\n");
    prompt.push_str(question);
    prompt.push_str("\n\nGive an accurate, detailed answer grounded in the context:");
    prompt
}

pub fn rag_messages(question: &str, sources: &[SearchResult]) -> Vec<ChatMessage> {
    let prompt = build_rag_prompt(question, &label_sources(sources));
    vec![
        ChatMessage::system(RAG_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ]
}

pub fn direct_messages(question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(DIRECT_SYSTEM_PROMPT),
        ChatMessage::user(question),
    ]
}

/// Raw source contents joined by newlines, as stored with auto-collected examples.
pub fn joined_context(sources: &[SearchResult]) -> String {
    sources
        .iter()
        .map(|result| result.document.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
