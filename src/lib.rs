//! Local retrieval-augmented knowledge engine.
//!
//! Documents are vectorized into an in-memory store, chat requests are
//! answered by a pluggable local model backend (Ollama, llama.cpp or vLLM)
//! grounded on retrieved documents, and answered interactions are harvested
//! into a training corpus that drives a single-flight training job.

pub mod core;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod training;
pub mod vector_math;
