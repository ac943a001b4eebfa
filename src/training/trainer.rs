//! Pluggable training procedure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::types::{ModelArtifact, TrainParams, TrainingMetrics};
use crate::core::errors::ApiError;
use crate::core::persist::{encode_snapshot, write_atomic};

pub const MODEL_FILE: &str = "model.json";

#[async_trait]
pub trait Trainer: Send + Sync {
    fn name(&self) -> &str;

    /// Trains on the curated dataset at `dataset`, holding `examples` records.
    async fn train(
        &self,
        dataset: &Path,
        examples: usize,
        params: &TrainParams,
    ) -> Result<TrainingMetrics, ApiError>;

    /// Persists the trained model under `output_dir` and returns its path.
    async fn save_model(
        &self,
        output_dir: &Path,
        artifact: &ModelArtifact,
    ) -> Result<PathBuf, ApiError>;
}

/// Sleeps for fixed durations and reports a synthetic loss curve.
#[derive(Debug, Clone)]
pub struct SimulatedTrainer {
    train_delay: Duration,
    save_delay: Duration,
}

impl SimulatedTrainer {
    pub fn new(train_delay: Duration, save_delay: Duration) -> Self {
        Self {
            train_delay,
            save_delay,
        }
    }
}

#[async_trait]
impl Trainer for SimulatedTrainer {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn train(
        &self,
        dataset: &Path,
        examples: usize,
        params: &TrainParams,
    ) -> Result<TrainingMetrics, ApiError> {
        tracing::info!(
            "Simulated {:?} training on {} ({} examples, {} epochs)",
            params.method,
            dataset.display(),
            examples,
            params.epochs
        );
        tokio::time::sleep(self.train_delay).await;

        let steps = f64::from(params.epochs) * (examples.max(1) as f64).ln_1p();
        Ok(TrainingMetrics {
            examples,
            epochs: params.epochs,
            final_loss: 2.0 / (1.0 + steps),
        })
    }

    async fn save_model(
        &self,
        output_dir: &Path,
        artifact: &ModelArtifact,
    ) -> Result<PathBuf, ApiError> {
        tokio::time::sleep(self.save_delay).await;
        let path = output_dir.join(MODEL_FILE);
        write_atomic(&path, encode_snapshot(artifact)?).await?;
        Ok(path)
    }
}
