use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use indexmap::IndexMap;

use super::trainer::{Trainer, MODEL_FILE};
use super::types::{
    clamp_rating, CuratedExample, JobState, JobStatus, ModelArtifact, NewExample, TrainParams,
    TrainingExample, TrainingMetrics, TrainingStats,
};
use crate::core::config::TrainingSettings;
use crate::core::errors::ApiError;
use crate::core::persist::{encode_snapshot, load_snapshot, write_atomic};
use crate::core::worker::BackgroundQueue;

pub const EXAMPLES_FILE: &str = "examples.json";
pub const DATASET_FILE: &str = "train.json";

/// Collects training examples and runs at most one training job at a time.
#[derive(Clone)]
pub struct TrainingJobManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    settings: TrainingSettings,
    data_dir: PathBuf,
    output_dir: PathBuf,
    examples: RwLock<IndexMap<String, TrainingExample>>,
    job: Mutex<JobState>,
    trainer: Arc<dyn Trainer>,
    write_lock: tokio::sync::Mutex<()>,
    queue: BackgroundQueue,
}

/// A claimed training slot.
///
/// Dropping a run that never reached `finish` marks the job failed, so the
/// slot is released on every exit path, including task cancellation.
pub struct TrainingRun {
    manager: TrainingJobManager,
    params: TrainParams,
    finished: bool,
}

impl TrainingRun {
    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    fn finish(mut self, outcome: Result<TrainingMetrics, String>) {
        self.finished = true;
        self.manager.record_outcome(outcome);
    }
}

impl fmt::Debug for TrainingRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingRun")
            .field("params", &self.params)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Drop for TrainingRun {
    fn drop(&mut self) {
        if !self.finished {
            self.manager
                .record_outcome(Err("training run aborted".to_string()));
        }
    }
}

impl TrainingJobManager {
    pub fn open(
        settings: TrainingSettings,
        data_dir: PathBuf,
        output_dir: PathBuf,
        trainer: Arc<dyn Trainer>,
        queue: BackgroundQueue,
    ) -> Self {
        let examples = load_examples(&data_dir.join(EXAMPLES_FILE));
        if !examples.is_empty() {
            tracing::info!("Loaded {} training example(s)", examples.len());
        }

        Self {
            inner: Arc::new(ManagerInner {
                settings,
                data_dir,
                output_dir,
                examples: RwLock::new(examples),
                job: Mutex::new(JobState::default()),
                trainer,
                write_lock: tokio::sync::Mutex::new(()),
                queue,
            }),
        }
    }

    pub fn default_params(&self) -> TrainParams {
        TrainParams::from_settings(&self.inner.settings)
    }

    pub fn add_example(&self, input: NewExample) -> String {
        let example = TrainingExample {
            id: uuid::Uuid::new_v4().to_string(),
            question: input.question,
            context: input.context,
            answer: input.answer,
            rating: clamp_rating(input.rating),
            feedback: input.feedback,
            source: input.source,
            created_at: Utc::now(),
        };
        let id = example.id.clone();

        let count = {
            let mut examples = self
                .inner
                .examples
                .write()
                .unwrap_or_else(|e| e.into_inner());
            examples.insert(id.clone(), example);
            examples.len()
        };

        tracing::debug!("Added {} example {}", input.source.as_str(), id);
        self.schedule_snapshot();

        if self.inner.settings.auto_train && count == self.inner.settings.min_examples() {
            tracing::info!("Example count reached {}, starting training", count);
            match self.launch(self.default_params()) {
                Ok(()) => {}
                Err(ApiError::AlreadyRunning) => {
                    tracing::info!("Auto-training skipped: a job is already running");
                }
                Err(err) => tracing::warn!("Auto-training could not start: {}", err),
            }
        }

        id
    }

    pub fn example_count(&self) -> usize {
        self.inner
            .examples
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn examples(&self) -> Vec<TrainingExample> {
        self.inner
            .examples
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Drops every collected example and snapshots the empty corpus.
    pub fn clear_examples(&self) -> usize {
        let removed = {
            let mut examples = self
                .inner
                .examples
                .write()
                .unwrap_or_else(|e| e.into_inner());
            let removed = examples.len();
            examples.clear();
            removed
        };
        tracing::info!("Cleared {} training example(s)", removed);
        self.schedule_snapshot();
        removed
    }

    pub fn status(&self) -> JobState {
        self.inner
            .job
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn stats(&self) -> TrainingStats {
        let job = self.status();
        TrainingStats {
            total_examples: self.example_count(),
            is_training: job.is_training(),
            progress: job.progress,
            status: job.status,
        }
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.inner.data_dir.join(DATASET_FILE)
    }

    pub fn examples_path(&self) -> PathBuf {
        self.inner.data_dir.join(EXAMPLES_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.inner.output_dir.join(MODEL_FILE)
    }

    /// Claims the training slot. Fails with `AlreadyRunning` without touching
    /// the current job if one is in progress.
    pub fn begin(&self, params: TrainParams) -> Result<TrainingRun, ApiError> {
        let mut job = self.inner.job.lock().unwrap_or_else(|e| e.into_inner());
        if job.is_training() {
            return Err(ApiError::AlreadyRunning);
        }

        let last_completed_at = job.last_completed_at;
        *job = JobState {
            status: JobStatus::Training,
            progress: 0.0,
            start_time: Some(Utc::now()),
            last_completed_at,
            ..JobState::default()
        };
        drop(job);

        tracing::info!(
            "Training started ({:?}, {} epochs) with {} example(s)",
            params.method,
            params.epochs,
            self.example_count()
        );
        Ok(TrainingRun {
            manager: self.clone(),
            params,
            finished: false,
        })
    }

    /// Runs a claimed job to completion.
    pub async fn run(&self, run: TrainingRun) -> Result<TrainingMetrics, ApiError> {
        let result = self.execute(run.params()).await;
        match &result {
            Ok(metrics) => run.finish(Ok(metrics.clone())),
            Err(err) => run.finish(Err(err.to_string())),
        }
        result
    }

    pub async fn start_training(&self, params: TrainParams) -> Result<TrainingMetrics, ApiError> {
        let run = self.begin(params)?;
        self.run(run).await
    }

    /// Claims the slot now and runs the job on the background queue.
    pub fn launch(&self, params: TrainParams) -> Result<(), ApiError> {
        let run = self.begin(params)?;
        let manager = self.clone();
        let queued = self.inner.queue.enqueue("training-job", async move {
            if let Err(err) = manager.run(run).await {
                tracing::warn!("Background training failed: {}", err);
            }
        });

        if queued {
            Ok(())
        } else {
            Err(ApiError::internal("background queue rejected the training job"))
        }
    }

    async fn execute(&self, params: &TrainParams) -> Result<TrainingMetrics, ApiError> {
        let dataset = self.curated_dataset();
        let dataset_path = self.dataset_path();
        write_atomic(&dataset_path, encode_snapshot(&dataset)?)
            .await
            .map_err(|e| ApiError::internal(format!("failed to prepare training data: {e}")))?;
        tracing::info!(
            "Prepared {} curated example(s) at {}",
            dataset.len(),
            dataset_path.display()
        );
        self.set_progress(30.0);

        let metrics = self
            .inner
            .trainer
            .train(&dataset_path, dataset.len(), params)
            .await?;
        self.set_progress(80.0);

        let artifact = ModelArtifact {
            params: params.clone(),
            examples: dataset.len(),
            metrics: metrics.clone(),
            created_at: Utc::now(),
        };
        let model_path = self
            .inner
            .trainer
            .save_model(&self.inner.output_dir, &artifact)
            .await?;
        tracing::info!(
            "{} trainer saved model to {}",
            self.inner.trainer.name(),
            model_path.display()
        );

        Ok(metrics)
    }

    /// Examples rated at or above `min_rating`, projected to instruction/input/output.
    pub fn curated_dataset(&self) -> Vec<CuratedExample> {
        let min_rating = self.inner.settings.min_rating;
        self.inner
            .examples
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|example| example.rating >= min_rating)
            .map(CuratedExample::from_example)
            .collect()
    }

    fn set_progress(&self, progress: f32) {
        let mut job = self.inner.job.lock().unwrap_or_else(|e| e.into_inner());
        if job.is_training() {
            job.progress = progress;
        }
    }

    fn record_outcome(&self, outcome: Result<TrainingMetrics, String>) {
        let mut job = self.inner.job.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        job.end_time = Some(now);
        match outcome {
            Ok(metrics) => {
                job.status = JobStatus::Completed;
                job.progress = 100.0;
                job.metrics = Some(metrics);
                job.error = None;
                job.last_completed_at = Some(now);
                tracing::info!("Training completed");
            }
            Err(reason) => {
                job.status = JobStatus::Failed;
                tracing::error!("Training failed: {}", reason);
                job.error = Some(reason);
            }
        }
    }

    /// Writes the example collection to disk and waits for the write.
    pub async fn persist(&self) -> Result<(), ApiError> {
        let _guard = self.inner.write_lock.lock().await;
        let bytes = {
            let examples = self
                .inner
                .examples
                .read()
                .unwrap_or_else(|e| e.into_inner());
            let ordered: Vec<&TrainingExample> = examples.values().collect();
            encode_snapshot(&ordered)?
        };
        write_atomic(&self.examples_path(), bytes).await
    }

    fn schedule_snapshot(&self) {
        let manager = self.clone();
        self.inner.queue.enqueue("training-examples-snapshot", async move {
            if let Err(err) = manager.persist().await {
                tracing::warn!(
                    "Failed to persist training examples to {}: {}",
                    manager.examples_path().display(),
                    err
                );
            }
        });
    }
}

fn load_examples(path: &Path) -> IndexMap<String, TrainingExample> {
    match load_snapshot::<Vec<TrainingExample>>(path) {
        Ok(Some(examples)) => examples
            .into_iter()
            .map(|example| (example.id.clone(), example))
            .collect(),
        Ok(None) => IndexMap::new(),
        Err(err) => {
            tracing::warn!("Ignoring training example snapshot: {}", err);
            IndexMap::new()
        }
    }
}
