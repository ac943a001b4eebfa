//! Training corpus collection and the single-flight training job.

pub mod manager;
pub mod trainer;
pub mod types;


pub use manager::{TrainingJobManager, TrainingRun};
pub use trainer::{SimulatedTrainer, Trainer};
pub use types::{
    CuratedExample, ExampleSource, JobState, JobStatus, ModelArtifact, NewExample, TrainMethod,
    TrainParams, TrainingExample, TrainingMetrics, TrainingStats,
};
