use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

/// A stored document with its vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Read view of a document; the vector never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl From<&Document> for DocumentView {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            content: doc.content.clone(),
            metadata: doc.metadata.clone(),
            created_at: doc.created_at,
        }
    }
}

impl DocumentView {
    /// `metadata["source"]` when it is a string.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: DocumentView,
    /// Cosine similarity, higher is better.
    pub score: f32,
    /// `1 - score`.
    pub distance: f32,
}

impl SearchResult {
    pub fn new(document: DocumentView, score: f32) -> Self {
        Self {
            document,
            score,
            distance: 1.0 - score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreStats {
    pub document_count: usize,
    pub dimension: usize,
    pub data_path: String,
}
