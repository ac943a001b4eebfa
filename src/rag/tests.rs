//! Orchestrator tests against a scripted model backend.

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use crate::core::config::{LlmSettings, TrainingSettings};
    use crate::core::errors::ApiError;
    use crate::core::worker::BackgroundQueue;
    use crate::llm::{ChatRequest, LlmProvider, ModelGateway, Role};
    use crate::rag::dto::{
        DeleteDocumentRequest, FeedbackRequest, IngestRequest, RagChatRequest, SearchRequest,
        TrainRequest,
    };
    use crate::rag::prompt::{DIRECT_SYSTEM_PROMPT, RAG_SYSTEM_PROMPT};
    use crate::rag::{HashVectorizer, RagOrchestrator, VectorStore};
    use crate::training::{ExampleSource, JobStatus, SimulatedTrainer, TrainingJobManager};

    enum Reply {
        Answer(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedProvider {
        reply: Reply,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> ChatRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<(), ApiError> {
            Ok(())
        }

        async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            match self.reply {
                Reply::Answer(text) => Ok(text.to_string()),
                Reply::Fail => Err(ApiError::Upstream {
                    status: 500,
                    body: "backend exploded".to_string(),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("late".to_string())
                }
            }
        }
    }

    struct Harness {
        engine: RagOrchestrator,
        queue: BackgroundQueue,
    }

    fn harness(root: &Path, gateway: ModelGateway, train_ms: u64) -> Harness {
        let (queue, _worker) = BackgroundQueue::spawn(128);
        let store = VectorStore::open(
            root.join("vector"),
            Arc::new(HashVectorizer::new(384)),
            queue.clone(),
        );
        let settings = TrainingSettings {
            simulated_train_ms: train_ms,
            simulated_save_ms: 0,
            ..TrainingSettings::default()
        };
        let trainer = Arc::new(SimulatedTrainer::new(
            Duration::from_millis(train_ms),
            Duration::ZERO,
        ));
        let training = TrainingJobManager::open(
            settings,
            root.join("training"),
            root.join("models"),
            trainer,
            queue.clone(),
        );
        Harness {
            engine: RagOrchestrator::new(store, gateway, training, queue.clone()),
            queue,
        }
    }

    fn scripted(provider: Arc<ScriptedProvider>) -> ModelGateway {
        ModelGateway::with_provider(LlmSettings::default(), provider)
    }

    fn ingest(engine: &RagOrchestrator, content: &str) -> String {
        engine
            .ingest(IngestRequest {
                content: content.to_string(),
                ..IngestRequest::default()
            })
            .unwrap()
            .doc_id
    }

    fn chat_request(message: &str, use_rag: bool) -> RagChatRequest {
        RagChatRequest {
            message: message.to_string(),
            use_rag,
            session_id: "session-1".to_string(),
            ..RagChatRequest::default()
        }
    }

    #[tokio::test]
    async fn direct_chat_skips_retrieval_and_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(Reply::Answer("hi there"));
        let h = harness(tmp.path(), scripted(provider.clone()), 0);
        ingest(&h.engine, "some stored knowledge");

        let response = h
            .engine
            .chat(chat_request("hello", false), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.answer, "hi there");
        assert!(response.sources.is_empty());
        assert!(!response.used_rag);
        assert_eq!(response.session_id, "session-1");

        let request = provider.last_request();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, DIRECT_SYSTEM_PROMPT);
        assert_eq!(request.messages[1].content, "hello");

        h.queue.drain().await;
        assert_eq!(h.engine.training().example_count(), 0);
    }

    #[tokio::test]
    async fn rag_chat_grounds_prompt_and_collects_example() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(Reply::Answer("Tokio schedules tasks."));
        let h = harness(tmp.path(), scripted(provider.clone()), 0);
        ingest(&h.engine, "tokio schedules async tasks");
        ingest(&h.engine, "sourdough needs a starter");

        let response = h
            .engine
            .chat(
                chat_request("how does tokio schedule tasks", true),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(response.used_rag);
        assert_eq!(response.sources.len(), 2);
        assert_eq!(response.sources[0].document.content, "tokio schedules async tasks");

        let request = provider.last_request();
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, RAG_SYSTEM_PROMPT);
        let prompt = &request.messages[1].content;
        assert!(prompt.contains("[Document 1] tokio schedules async tasks"));
        assert!(prompt.contains("[Question]\nhow does tokio schedule tasks"));

        h.queue.drain().await;
        let examples = h.engine.training().examples();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].source, ExampleSource::AutoCollect);
        assert_eq!(examples[0].rating, 4.0);
        assert_eq!(examples[0].answer, "Tokio schedules tasks.");
        assert_eq!(
            examples[0].context,
            "tokio schedules async tasks\nsourdough needs a starter"
        );
    }

    #[tokio::test]
    async fn rag_chat_on_empty_store_collects_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(Reply::Answer("no idea"));
        let h = harness(tmp.path(), scripted(provider), 0);

        let response = h
            .engine
            .chat(chat_request("anything", true), &CancellationToken::new())
            .await
            .unwrap();
        assert!(response.sources.is_empty());

        h.queue.drain().await;
        assert_eq!(h.engine.training().example_count(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_returned_and_not_collected() {
        let tmp = tempfile::tempdir().unwrap();
        let h = harness(tmp.path(), scripted(ScriptedProvider::new(Reply::Fail)), 0);
        ingest(&h.engine, "document");

        let err = h
            .engine
            .chat(chat_request("document", true), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upstream { status: 500, .. }));

        h.queue.drain().await;
        assert_eq!(h.engine.training().example_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_chat_aborts_backend_call() {
        let tmp = tempfile::tempdir().unwrap();
        let h = harness(tmp.path(), scripted(ScriptedProvider::new(Reply::Hang)), 0);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = h
            .engine
            .chat(chat_request("wait", false), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Cancelled));
    }

    #[tokio::test]
    async fn blank_message_is_rejected_before_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(Reply::Answer("unused"));
        let h = harness(tmp.path(), scripted(provider.clone()), 0);

        let err = h
            .engine
            .chat(chat_request("  ", true), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ingest_search_and_delete_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let h = harness(
            tmp.path(),
            scripted(ScriptedProvider::new(Reply::Answer("-"))),
            0,
        );

        h.engine
            .ingest(IngestRequest {
                content: "rust ownership and the borrow checker".to_string(),
                source: "book.md".to_string(),
                ..IngestRequest::default()
            })
            .unwrap();
        let second = ingest(&h.engine, "python garbage collector internals");
        ingest(&h.engine, "kubernetes pods and deployments");

        let found = h
            .engine
            .search(SearchRequest {
                query: "python collector".to_string(),
                top_k: 1,
            })
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.results[0].document.id, second);

        let first = h
            .engine
            .search(SearchRequest {
                query: "borrow checker".to_string(),
                top_k: 1,
            })
            .unwrap();
        assert_eq!(first.results[0].document.source(), Some("book.md"));

        h.engine
            .delete_document(DeleteDocumentRequest { id: second.clone() })
            .unwrap();
        let again = h
            .engine
            .delete_document(DeleteDocumentRequest { id: second })
            .unwrap_err();
        assert!(matches!(again, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_defaults_to_ten_results() {
        let tmp = tempfile::tempdir().unwrap();
        let h = harness(
            tmp.path(),
            scripted(ScriptedProvider::new(Reply::Answer("-"))),
            0,
        );
        for i in 0..12 {
            ingest(&h.engine, &format!("entry {i}"));
        }

        let response = h
            .engine
            .search(SearchRequest {
                query: "entry".to_string(),
                top_k: 0,
            })
            .unwrap();
        assert_eq!(response.total, 10);
        assert_eq!(response.results.len(), 10);
    }

    #[tokio::test]
    async fn feedback_is_validated_and_stored() {
        let tmp = tempfile::tempdir().unwrap();
        let h = harness(
            tmp.path(),
            scripted(ScriptedProvider::new(Reply::Answer("-"))),
            0,
        );

        let out_of_range = FeedbackRequest {
            question: "q".to_string(),
            answer: "a".to_string(),
            rating: Some(6.0),
            ..FeedbackRequest::default()
        };
        assert!(matches!(
            h.engine.submit_feedback(out_of_range),
            Err(ApiError::Validation(_))
        ));

        let accepted = h
            .engine
            .submit_feedback(FeedbackRequest {
                question_id: "q-1".to_string(),
                question: "what is rust".to_string(),
                answer: "a language".to_string(),
                rating: Some(5.0),
                feedback: "spot on".to_string(),
            })
            .unwrap();
        assert_eq!(accepted.status, "success");

        let examples = h.engine.training().examples();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].id, accepted.example_id);
        assert_eq!(examples[0].source, ExampleSource::UserFeedback);
        assert_eq!(examples[0].feedback, "spot on");
        assert!(examples[0].context.is_empty());
    }

    #[tokio::test]
    async fn training_launch_reports_progress_then_completion() {
        let tmp = tempfile::tempdir().unwrap();
        let h = harness(
            tmp.path(),
            scripted(ScriptedProvider::new(Reply::Answer("-"))),
            300,
        );

        let started = h.engine.start_training(TrainRequest::default()).unwrap();
        assert_eq!(started.status, "started");

        let status = h.engine.training_status();
        assert_eq!(status.status, "training");
        assert!(status.message.starts_with("Training in progress..."));
        assert!(status.end_time.is_none());

        let err = h.engine.start_training(TrainRequest::default()).unwrap_err();
        assert!(matches!(err, ApiError::AlreadyRunning));

        h.queue.drain().await;
        let done = h.engine.training_status();
        assert_eq!(done.status, JobStatus::Completed.as_str());
        assert_eq!(done.progress, 100.0);
        assert_eq!(done.message, "Training completed");
        assert!(done.metrics.unwrap().contains_key("final_loss"));
        assert!(h.engine.stats().last_training_time.is_some());
    }

    #[tokio::test]
    async fn stats_reflect_collections_and_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = LlmSettings {
            backend: "vllm".to_string(),
            model: "mistral-7b".to_string(),
            ..LlmSettings::default()
        };
        let gateway = ModelGateway::with_provider(
            settings,
            ScriptedProvider::new(Reply::Answer("-")),
        );
        let h = harness(tmp.path(), gateway, 0);
        ingest(&h.engine, "one");
        ingest(&h.engine, "two");

        let stats = h.engine.stats();
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.total_examples, 0);
        assert_eq!(stats.model_info.backend, "vllm");
        assert_eq!(stats.model_info.name, "mistral-7b");
        assert_eq!(stats.model_info.status, "running");
        assert_eq!(stats.vector_store_status, "healthy");
        assert!(stats.last_training_time.is_none());

        let encoded = serde_json::to_value(&stats).unwrap();
        assert_eq!(encoded["model_info"]["backend"], json!("vllm"));
    }

    #[tokio::test]
    async fn health_reports_backend_or_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();

        let healthy = harness(
            tmp.path(),
            scripted(ScriptedProvider::new(Reply::Answer("-"))),
            0,
        );
        let report = healthy.engine.check_health(&cancel).await.unwrap();
        assert_eq!(report.status, "healthy");

        let unconfigured = harness(
            tmp.path(),
            ModelGateway::new(LlmSettings::default()).unwrap(),
            0,
        );
        let err = unconfigured.engine.check_health(&cancel).await.unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
        assert_eq!(unconfigured.engine.stats().model_info.status, "unconfigured");
    }
}
