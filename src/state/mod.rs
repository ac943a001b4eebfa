use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{AppPaths, ConfigService, EngineConfig};
use crate::core::worker::BackgroundQueue;
use crate::llm::ModelGateway;
use crate::rag::{HashVectorizer, RagOrchestrator, VectorStore};
use crate::training::{SimulatedTrainer, TrainingJobManager};

pub mod error;

use error::InitializationError;

/// Application state shared by every route and background job.
///
/// Built once at startup and handed to callers by handle; there is no
/// process-global instance.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<EngineConfig>,
    pub queue: BackgroundQueue,
    pub engine: RagOrchestrator,
}

impl AppState {
    /// Loads `config.yml` (plus environment overrides) and builds the engine.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone())
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        Self::build(paths, config)
    }

    /// Wires the engine from an already-loaded configuration.
    ///
    /// Must run inside a tokio runtime: the background worker is spawned here.
    pub fn build(
        paths: Arc<AppPaths>,
        config: EngineConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let (queue, _worker) = BackgroundQueue::spawn(config.worker.queue_capacity);

        let gateway = ModelGateway::new(config.llm.clone())
            .map_err(|e| InitializationError::Llm(e.into()))?;
        tracing::info!(
            "Model gateway: backend={} model={}",
            gateway.backend(),
            gateway.model()
        );

        let store = VectorStore::open(
            paths.resolve(&config.vector_store.data_path),
            Arc::new(HashVectorizer::new(config.embedding.dimension)),
            queue.clone(),
        );

        let trainer = Arc::new(SimulatedTrainer::new(
            Duration::from_millis(config.training.simulated_train_ms),
            Duration::from_millis(config.training.simulated_save_ms),
        ));
        let training = TrainingJobManager::open(
            config.training.clone(),
            paths.resolve(&config.training.data_path),
            paths.resolve(&config.training.output_path),
            trainer,
            queue.clone(),
        );

        let engine = RagOrchestrator::new(store, gateway, training, queue.clone());

        Ok(Arc::new(AppState {
            paths,
            config: Arc::new(config),
            queue,
            engine,
        }))
    }
}
