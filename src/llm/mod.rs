pub mod llama_cpp;
pub mod ollama;
pub mod provider;
pub mod service;
pub mod types;
pub mod vllm;


pub use provider::LlmProvider;
pub use service::ModelGateway;
pub use types::{BackendKind, ChatMessage, ChatRequest, Role};
