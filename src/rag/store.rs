//! In-memory document collection with best-effort JSON snapshots.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::Mutex;

use super::types::{Document, DocumentView, Metadata, SearchResult, VectorStoreStats};
use super::vectorizer::Vectorizer;
use crate::core::errors::ApiError;
use crate::core::persist::{encode_snapshot, load_snapshot, write_atomic};
use crate::core::worker::BackgroundQueue;
use crate::vector_math::rank_descending_by_cosine;

pub const SNAPSHOT_FILE: &str = "documents.json";
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Clone)]
pub struct VectorStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    documents: RwLock<IndexMap<String, Document>>,
    vectorizer: Arc<dyn Vectorizer>,
    data_dir: PathBuf,
    snapshot_path: PathBuf,
    /// Serialises snapshot writers; the snapshot is taken while it is held.
    write_lock: Mutex<()>,
    queue: BackgroundQueue,
}

impl VectorStore {
    /// Opens the store rooted at `data_dir`, loading `documents.json` if present.
    pub fn open(data_dir: PathBuf, vectorizer: Arc<dyn Vectorizer>, queue: BackgroundQueue) -> Self {
        let snapshot_path = data_dir.join(SNAPSHOT_FILE);
        let documents = load_documents(&snapshot_path, vectorizer.as_ref());
        if !documents.is_empty() {
            tracing::info!(
                "Loaded {} document(s) from {}",
                documents.len(),
                snapshot_path.display()
            );
        }

        Self {
            inner: Arc::new(StoreInner {
                documents: RwLock::new(documents),
                vectorizer,
                data_dir,
                snapshot_path,
                write_lock: Mutex::new(()),
                queue,
            }),
        }
    }

    pub fn add_document(&self, content: impl Into<String>, metadata: Metadata) -> String {
        let content = content.into();
        let vector = self.inner.vectorizer.vectorize(&content);
        let document = Document {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            metadata,
            vector,
            created_at: Utc::now(),
        };
        let id = document.id.clone();

        {
            let mut documents = self
                .inner
                .documents
                .write()
                .unwrap_or_else(|e| e.into_inner());
            documents.insert(id.clone(), document);
        }

        tracing::debug!("Added document {}", id);
        self.schedule_snapshot();
        id
    }

    /// Full-scan cosine ranking. `top_k == 0` means `DEFAULT_TOP_K`.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let top_k = if top_k == 0 { DEFAULT_TOP_K } else { top_k };
        let query_vector = self.inner.vectorizer.vectorize(query);

        let documents = self
            .inner
            .documents
            .read()
            .unwrap_or_else(|e| e.into_inner());
        if documents.is_empty() {
            return Vec::new();
        }

        rank_descending_by_cosine(
            &query_vector,
            documents.values().map(|doc| doc.vector.as_slice()),
        )
        .into_iter()
        .take(top_k)
        .filter_map(|(idx, score)| {
            documents
                .get_index(idx)
                .map(|(_, doc)| SearchResult::new(DocumentView::from(doc), score))
        })
        .collect()
    }

    pub fn get_document(&self, id: &str) -> Option<DocumentView> {
        let documents = self
            .inner
            .documents
            .read()
            .unwrap_or_else(|e| e.into_inner());
        documents.get(id).map(DocumentView::from)
    }

    pub fn delete_document(&self, id: &str) -> Result<(), ApiError> {
        let removed = {
            let mut documents = self
                .inner
                .documents
                .write()
                .unwrap_or_else(|e| e.into_inner());
            documents.shift_remove(id)
        };

        match removed {
            Some(_) => {
                tracing::debug!("Deleted document {}", id);
                self.schedule_snapshot();
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("document {id}"))),
        }
    }

    pub fn document_count(&self) -> usize {
        self.inner
            .documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn stats(&self) -> VectorStoreStats {
        VectorStoreStats {
            document_count: self.document_count(),
            dimension: self.inner.vectorizer.dimension(),
            data_path: self.inner.data_dir.display().to_string(),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.inner.snapshot_path
    }

    /// Writes the current collection to disk and waits for the write.
    pub async fn persist(&self) -> Result<(), ApiError> {
        let _guard = self.inner.write_lock.lock().await;
        let bytes = {
            let documents = self
                .inner
                .documents
                .read()
                .unwrap_or_else(|e| e.into_inner());
            let ordered: Vec<&Document> = documents.values().collect();
            encode_snapshot(&ordered)?
        };
        write_atomic(&self.inner.snapshot_path, bytes).await
    }

    fn schedule_snapshot(&self) {
        let store = self.clone();
        self.inner.queue.enqueue("vector-store-snapshot", async move {
            if let Err(err) = store.persist().await {
                tracing::warn!(
                    "Failed to persist documents to {}: {}",
                    store.snapshot_path().display(),
                    err
                );
            }
        });
    }
}

fn load_documents(path: &Path, vectorizer: &dyn Vectorizer) -> IndexMap<String, Document> {
    let stored: Vec<Document> = match load_snapshot(path) {
        Ok(Some(documents)) => documents,
        Ok(None) => return IndexMap::new(),
        Err(err) => {
            tracing::warn!("Ignoring document snapshot: {}", err);
            return IndexMap::new();
        }
    };

    let dimension = vectorizer.dimension();
    let mut revectorized = 0usize;
    let mut documents = IndexMap::with_capacity(stored.len());
    for mut doc in stored {
        if doc.vector.len() != dimension {
            doc.vector = vectorizer.vectorize(&doc.content);
            revectorized += 1;
        }
        documents.insert(doc.id.clone(), doc);
    }

    if revectorized > 0 {
        tracing::info!(
            "Re-vectorized {} document(s) for dimension {}",
            revectorized,
            dimension
        );
    }
    documents
}
