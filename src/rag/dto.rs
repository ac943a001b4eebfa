//! Request and response shapes exchanged with callers.
//!
//! Every request derives `Deserialize` with defaults so that missing fields
//! surface as `ApiError::Validation` from `validate()` rather than as a
//! deserialisation failure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Metadata, SearchResult};
use crate::core::errors::ApiError;
use crate::training::types::{JobState, TrainMethod, TrainParams, MAX_RATING, MIN_RATING};

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Negative and zero counts both mean "use the default".
fn top_k_or(top_k: i64, default: usize) -> usize {
    if top_k <= 0 {
        default
    } else {
        usize::try_from(top_k).unwrap_or(default)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagChatRequest {
    pub message: String,
    pub use_rag: bool,
    pub top_k: i64,
    pub session_id: String,
}

impl RagChatRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require("message", &self.message)
    }

    pub fn top_k(&self) -> usize {
        top_k_or(self.top_k, 5)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RagChatResponse {
    pub answer: String,
    pub sources: Vec<SearchResult>,
    pub used_rag: bool,
    pub session_id: String,
    pub elapsed: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestRequest {
    pub content: String,
    pub metadata: Metadata,
    pub source: String,
}

impl IngestRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require("content", &self.content)
    }

    /// Metadata with `source` recorded, unless the caller already set it.
    pub fn merged_metadata(&self) -> Metadata {
        let mut metadata = self.metadata.clone();
        let source = self.source.trim();
        if !source.is_empty() && !metadata.contains_key("source") {
            metadata.insert("source".to_string(), source.into());
        }
        metadata
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub doc_id: String,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: i64,
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require("query", &self.query)
    }

    pub fn top_k(&self) -> usize {
        top_k_or(self.top_k, 10)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub elapsed: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackRequest {
    pub question_id: String,
    pub question: String,
    pub answer: String,
    pub rating: Option<f32>,
    pub feedback: String,
}

impl FeedbackRequest {
    /// Returns the validated rating.
    pub fn validate(&self) -> Result<f32, ApiError> {
        require("question", &self.question)?;
        require("answer", &self.answer)?;
        match self.rating {
            None => Err(ApiError::validation("rating is required")),
            Some(rating) if !(MIN_RATING..=MAX_RATING).contains(&rating) => Err(
                ApiError::validation(format!("rating must be between 1 and 5, got {rating}")),
            ),
            Some(rating) => Ok(rating),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResponse {
    pub status: String,
    pub example_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrainRequest {
    pub method: String,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub use_gpu: bool,
}

impl TrainRequest {
    /// Overlays the request on `defaults`; zero values keep the default.
    pub fn into_params(self, defaults: TrainParams) -> Result<TrainParams, ApiError> {
        let method = TrainMethod::parse(&self.method).ok_or_else(|| {
            ApiError::validation(format!(
                "unknown training method '{}', expected lora or full",
                self.method
            ))
        })?;
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(ApiError::validation("learning_rate must be positive"));
        }

        Ok(TrainParams {
            method,
            epochs: if self.epochs == 0 { defaults.epochs } else { self.epochs },
            batch_size: if self.batch_size == 0 {
                defaults.batch_size
            } else {
                self.batch_size
            },
            learning_rate: if self.learning_rate == 0.0 {
                defaults.learning_rate
            } else {
                self.learning_rate
            },
            use_gpu: self.use_gpu,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainStartResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainStatusResponse {
    pub status: String,
    pub progress: f32,
    pub message: String,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, f64>>,
}

impl From<&JobState> for TrainStatusResponse {
    fn from(job: &JobState) -> Self {
        Self {
            status: job.status.as_str().to_string(),
            progress: job.progress,
            message: job.message(),
            start_time: job.start_time,
            end_time: job.end_time,
            metrics: job.metrics.as_ref().map(|m| m.to_map()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub backend: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_documents: usize,
    pub total_examples: usize,
    pub model_info: ModelInfo,
    pub last_training_time: Option<DateTime<Utc>>,
    pub vector_store_status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteDocumentRequest {
    pub id: String,
}

impl DeleteDocumentRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require("id", &self.id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteDocumentResponse {
    pub status: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub model: String,
}
