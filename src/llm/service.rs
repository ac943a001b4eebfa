use std::future::Future;
use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::llama_cpp::LlamaCppProvider;
use super::ollama::OllamaProvider;
use super::provider::LlmProvider;
use super::types::{BackendKind, ChatMessage, ChatRequest};
use super::vllm::VllmProvider;
use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;

/// Uniform chat/health façade over the configured inference backend.
#[derive(Clone)]
pub struct ModelGateway {
    settings: LlmSettings,
    backend: BackendKind,
    provider: Option<Arc<dyn LlmProvider>>,
}

impl ModelGateway {
    pub fn new(settings: LlmSettings) -> Result<Self, ApiError> {
        let backend = BackendKind::parse_or_default(&settings.backend);
        let base_url = settings.base_url.trim();

        let provider: Option<Arc<dyn LlmProvider>> = if base_url.is_empty() {
            tracing::warn!("LLM base_url is not configured; chat and health checks will fail");
            None
        } else {
            let client = Client::builder()
                .timeout(settings.timeout())
                .build()
                .map_err(ApiError::internal)?;
            let provider: Arc<dyn LlmProvider> = match backend {
                BackendKind::Ollama => {
                    Arc::new(OllamaProvider::new(base_url, &settings.model, client))
                }
                BackendKind::LlamaCpp => Arc::new(LlamaCppProvider::new(base_url, client)),
                BackendKind::Vllm => Arc::new(VllmProvider::new(base_url, &settings.model, client)),
            };
            Some(provider)
        };

        Ok(Self {
            settings,
            backend,
            provider,
        })
    }

    /// Wraps an already-built provider (custom backends, tests).
    pub fn with_provider(settings: LlmSettings, provider: Arc<dyn LlmProvider>) -> Self {
        let backend = BackendKind::parse_or_default(&settings.backend);
        Self {
            settings,
            backend,
            provider: Some(provider),
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        let provider = self.provider()?;
        let request = ChatRequest::new(messages)
            .with_sampling(self.settings.temperature, self.settings.max_tokens);

        tracing::debug!(
            "Sending {} message(s) to {}",
            request.messages.len(),
            provider.name()
        );
        run_cancellable(cancel, provider.chat(&request)).await
    }

    pub async fn check_health(&self, cancel: &CancellationToken) -> Result<(), ApiError> {
        let provider = self.provider()?;
        run_cancellable(cancel, provider.health_check()).await
    }

    fn provider(&self) -> Result<&Arc<dyn LlmProvider>, ApiError> {
        self.provider.as_ref().ok_or_else(|| {
            ApiError::Config(format!(
                "local model is not configured: set llm.base_url for the {} backend",
                self.backend
            ))
        })
    }
}

async fn run_cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        result = call => result,
    }
}
