//! Retrieval-augmented generation.
//!
//! - `VectorStore`: the document collection and cosine search
//! - `Vectorizer`: text → vector strategy (`HashVectorizer` placeholder)
//! - `RagOrchestrator`: chat, ingestion and feedback on top of the store,
//!   the model gateway and the training manager

pub mod dto;
pub mod orchestrator;
pub mod prompt;
pub mod store;
pub mod types;
pub mod vectorizer;

#[cfg(test)]
mod tests;

pub use orchestrator::RagOrchestrator;
pub use store::VectorStore;
pub use types::{Document, DocumentView, Metadata, SearchResult, VectorStoreStats};
pub use vectorizer::{HashVectorizer, Vectorizer};
