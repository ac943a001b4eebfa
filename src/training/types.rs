use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::TrainingSettings;

pub const MIN_RATING: f32 = 1.0;
pub const MAX_RATING: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleSource {
    UserFeedback,
    AutoCollect,
}

impl ExampleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExampleSource::UserFeedback => "user_feedback",
            ExampleSource::AutoCollect => "auto_collect",
        }
    }
}

/// A labelled question/answer pair. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub context: String,
    pub answer: String,
    pub rating: f32,
    #[serde(default)]
    pub feedback: String,
    pub source: ExampleSource,
    pub created_at: DateTime<Utc>,
}

/// Input for `TrainingJobManager::add_example`.
#[derive(Debug, Clone)]
pub struct NewExample {
    pub question: String,
    pub context: String,
    pub answer: String,
    pub rating: f32,
    pub feedback: String,
    pub source: ExampleSource,
}

/// Clamps into [1, 5]; NaN becomes the minimum.
pub fn clamp_rating(rating: f32) -> f32 {
    if rating.is_nan() {
        MIN_RATING
    } else {
        rating.clamp(MIN_RATING, MAX_RATING)
    }
}

/// One record of the curated dataset (`train.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedExample {
    pub instruction: String,
    pub input: String,
    pub output: String,
}

impl CuratedExample {
    pub fn from_example(example: &TrainingExample) -> Self {
        Self {
            instruction: "Answer the question based on the following context".to_string(),
            input: format!(
                "Context: {}\n\nQuestion: {}",
                example.context, example.question
            ),
            output: example.answer.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Training,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Training => "training",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainMethod {
    #[default]
    Lora,
    Full,
}

impl TrainMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "lora" => Some(TrainMethod::Lora),
            "full" => Some(TrainMethod::Full),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
    pub method: TrainMethod,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub use_gpu: bool,
}

impl TrainParams {
    pub fn from_settings(settings: &TrainingSettings) -> Self {
        Self {
            method: TrainMethod::default(),
            epochs: settings.epochs.max(1),
            batch_size: settings.batch_size.max(1),
            learning_rate: settings.learning_rate,
            use_gpu: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub examples: usize,
    pub epochs: u32,
    pub final_loss: f64,
}

impl TrainingMetrics {
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("examples".to_string(), self.examples as f64),
            ("epochs".to_string(), f64::from(self.epochs)),
            ("final_loss".to_string(), self.final_loss),
        ])
    }
}

/// Written to `model.json` once a run finishes training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(flatten)]
    pub params: TrainParams,
    pub examples: usize,
    pub metrics: TrainingMetrics,
    pub created_at: DateTime<Utc>,
}

/// The singleton job. `status == Training` is the in-progress flag.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobState {
    pub status: JobStatus,
    pub progress: f32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub metrics: Option<TrainingMetrics>,
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl JobState {
    pub fn is_training(&self) -> bool {
        self.status == JobStatus::Training
    }

    pub fn message(&self) -> String {
        match self.status {
            JobStatus::Idle => "Not training".to_string(),
            JobStatus::Training => format!("Training in progress... {:.1}%", self.progress),
            JobStatus::Completed => "Training completed".to_string(),
            JobStatus::Failed => format!(
                "Training failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingStats {
    pub total_examples: usize,
    pub is_training: bool,
    pub progress: f32,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_are_clamped_into_range() {
        assert_eq!(clamp_rating(0.0), 1.0);
        assert_eq!(clamp_rating(7.5), 5.0);
        assert_eq!(clamp_rating(3.5), 3.5);
        assert_eq!(clamp_rating(f32::NAN), 1.0);
    }

    #[test]
    fn job_messages_follow_status() {
        let mut state = JobState::default();
        assert_eq!(state.message(), "Not training");

        state.status = JobStatus::Training;
        state.progress = 30.0;
        assert_eq!(state.message(), "Training in progress... 30.0%");

        state.status = JobStatus::Failed;
        state.error = Some("disk full".to_string());
        assert_eq!(state.message(), "Training failed: disk full");
    }

    #[test]
    fn sources_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(ExampleSource::AutoCollect).unwrap(),
            "auto_collect"
        );
        assert_eq!(
            serde_json::to_value(ExampleSource::UserFeedback).unwrap(),
            "user_feedback"
        );
    }

    #[test]
    fn train_method_parsing_defaults_to_lora() {
        assert_eq!(TrainMethod::parse(""), Some(TrainMethod::Lora));
        assert_eq!(TrainMethod::parse("FULL"), Some(TrainMethod::Full));
        assert_eq!(TrainMethod::parse("qlora"), None);
    }
}
