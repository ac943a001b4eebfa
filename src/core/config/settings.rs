//! Typed configuration for the knowledge engine.
//!
//! Every section carries `#[serde(default)]` so a partial or missing
//! `config.yml` still produces a usable configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MIN_EXAMPLES: usize = 100;
pub const DEFAULT_DIMENSION: usize = 384;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub training: TrainingSettings,
    pub worker: WorkerSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// "ollama", "llama.cpp" or "vllm".
    pub backend: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: "ollama".to_string(),
            base_url: String::new(),
            model: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> std::time::Duration {
        let secs = if self.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            self.timeout_secs
        };
        std::time::Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub data_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            data_path: "data/vector".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub data_path: String,
    pub output_path: String,
    pub auto_train: bool,
    pub min_examples: usize,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub min_rating: f32,
    pub simulated_train_ms: u64,
    pub simulated_save_ms: u64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            data_path: "data/training".to_string(),
            output_path: "models/finetuned".to_string(),
            auto_train: false,
            min_examples: DEFAULT_MIN_EXAMPLES,
            epochs: 3,
            batch_size: 4,
            learning_rate: 2e-4,
            min_rating: 3.0,
            simulated_train_ms: 5_000,
            simulated_save_ms: 2_000,
        }
    }
}

impl TrainingSettings {
    pub fn min_examples(&self) -> usize {
        if self.min_examples == 0 {
            DEFAULT_MIN_EXAMPLES
        } else {
            self.min_examples
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub queue_capacity: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
        }
    }
}
