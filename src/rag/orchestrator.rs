use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::dto::{
    DeleteDocumentRequest, DeleteDocumentResponse, FeedbackRequest, FeedbackResponse,
    HealthResponse, IngestRequest, IngestResponse, ModelInfo, RagChatRequest, RagChatResponse,
    SearchRequest, SearchResponse, StatsResponse, TrainRequest, TrainStartResponse,
    TrainStatusResponse,
};
use super::prompt;
use super::store::VectorStore;
use super::types::SearchResult;
use crate::core::errors::ApiError;
use crate::core::worker::BackgroundQueue;
use crate::llm::ModelGateway;
use crate::training::{ExampleSource, NewExample, TrainingJobManager};

/// Rating given to answers collected automatically from RAG chats.
pub const AUTO_COLLECT_RATING: f32 = 4.0;

/// Entry point for callers: retrieval, generation, ingestion and feedback.
#[derive(Clone)]
pub struct RagOrchestrator {
    store: VectorStore,
    gateway: ModelGateway,
    training: TrainingJobManager,
    queue: BackgroundQueue,
}

impl RagOrchestrator {
    pub fn new(
        store: VectorStore,
        gateway: ModelGateway,
        training: TrainingJobManager,
        queue: BackgroundQueue,
    ) -> Self {
        Self {
            store,
            gateway,
            training,
            queue,
        }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn training(&self) -> &TrainingJobManager {
        &self.training
    }

    pub async fn chat(
        &self,
        request: RagChatRequest,
        cancel: &CancellationToken,
    ) -> Result<RagChatResponse, ApiError> {
        request.validate()?;
        let started = Instant::now();

        let (answer, sources) = if request.use_rag {
            let sources = self.store.search(&request.message, request.top_k());
            tracing::debug!("Retrieved {} source(s) for chat", sources.len());
            let messages = prompt::rag_messages(&request.message, &sources);
            let answer = self.gateway.chat(messages, cancel).await?;
            (answer, sources)
        } else {
            let messages = prompt::direct_messages(&request.message);
            let answer = self.gateway.chat(messages, cancel).await?;
            (answer, Vec::new())
        };

        if request.use_rag && !sources.is_empty() {
            self.collect_interaction(&request.message, &sources, &answer);
        }

        Ok(RagChatResponse {
            answer,
            sources,
            used_rag: request.use_rag,
            session_id: request.session_id,
            elapsed: format!("{:?}", started.elapsed()),
        })
    }

    /// Queues the answered interaction as a training example.
    fn collect_interaction(&self, question: &str, sources: &[SearchResult], answer: &str) {
        let example = NewExample {
            question: question.to_string(),
            context: prompt::joined_context(sources),
            answer: answer.to_string(),
            rating: AUTO_COLLECT_RATING,
            feedback: String::new(),
            source: ExampleSource::AutoCollect,
        };
        let training = self.training.clone();
        self.queue.enqueue("auto-collect-example", async move {
            training.add_example(example);
        });
    }

    pub fn ingest(&self, request: IngestRequest) -> Result<IngestResponse, ApiError> {
        request.validate()?;
        let metadata = request.merged_metadata();
        let doc_id = self.store.add_document(request.content, metadata);
        let created_at = self
            .store
            .get_document(&doc_id)
            .map(|doc| doc.created_at)
            .unwrap_or_else(Utc::now);

        tracing::info!("Ingested document {}", doc_id);
        Ok(IngestResponse {
            doc_id,
            status: "success".to_string(),
            message: "Document added to the knowledge base".to_string(),
            created_at,
        })
    }

    pub fn search(&self, request: SearchRequest) -> Result<SearchResponse, ApiError> {
        request.validate()?;
        let started = Instant::now();
        let results = self.store.search(&request.query, request.top_k());
        Ok(SearchResponse {
            total: results.len(),
            results,
            elapsed: format!("{:?}", started.elapsed()),
        })
    }

    pub fn delete_document(
        &self,
        request: DeleteDocumentRequest,
    ) -> Result<DeleteDocumentResponse, ApiError> {
        request.validate()?;
        self.store.delete_document(&request.id)?;
        Ok(DeleteDocumentResponse {
            status: "deleted".to_string(),
            id: request.id,
        })
    }

    pub fn submit_feedback(&self, request: FeedbackRequest) -> Result<FeedbackResponse, ApiError> {
        let rating = request.validate()?;
        if !request.question_id.is_empty() {
            tracing::debug!("Feedback received for question {}", request.question_id);
        }

        let example_id = self.training.add_example(NewExample {
            question: request.question,
            context: String::new(),
            answer: request.answer,
            rating,
            feedback: request.feedback,
            source: ExampleSource::UserFeedback,
        });
        Ok(FeedbackResponse {
            status: "success".to_string(),
            example_id,
        })
    }

    /// Claims the training slot and runs the job in the background.
    pub fn start_training(&self, request: TrainRequest) -> Result<TrainStartResponse, ApiError> {
        let params = request.into_params(self.training.default_params())?;
        self.training.launch(params)?;
        Ok(TrainStartResponse {
            status: "started".to_string(),
            message: "Training job launched".to_string(),
        })
    }

    pub fn training_status(&self) -> TrainStatusResponse {
        TrainStatusResponse::from(&self.training.status())
    }

    pub fn stats(&self) -> StatsResponse {
        let job = self.training.status();
        let status = if self.gateway.is_configured() {
            "running"
        } else {
            "unconfigured"
        };

        StatsResponse {
            total_documents: self.store.document_count(),
            total_examples: self.training.example_count(),
            model_info: ModelInfo {
                name: self.gateway.model().to_string(),
                backend: self.gateway.backend().as_str().to_string(),
                status: status.to_string(),
            },
            last_training_time: job.last_completed_at,
            vector_store_status: "healthy".to_string(),
        }
    }

    pub async fn check_health(&self, cancel: &CancellationToken) -> Result<HealthResponse, ApiError> {
        self.gateway.check_health(cancel).await?;
        Ok(HealthResponse {
            status: "healthy".to_string(),
            backend: self.gateway.backend().as_str().to_string(),
            model: self.gateway.model().to_string(),
        })
    }
}
