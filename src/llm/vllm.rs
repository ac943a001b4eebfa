use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::provider::{missing_content, HttpEndpoint, LlmProvider};
use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::ApiError;

/// vLLM through its OpenAI-compatible surface.
#[derive(Clone)]
pub struct VllmProvider {
    endpoint: HttpEndpoint,
    model: String,
}

impl VllmProvider {
    pub fn new(base_url: &str, model: &str, client: Client) -> Self {
        Self {
            endpoint: HttpEndpoint::new(base_url, client),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[async_trait]
impl LlmProvider for VllmProvider {
    fn name(&self) -> &str {
        "vllm"
    }

    async fn health_check(&self) -> Result<(), ApiError> {
        self.endpoint.get_ok("/v1/models").await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let payload = self.endpoint.post_json("/v1/chat/completions", &body).await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| missing_content(self.name()))
    }
}
