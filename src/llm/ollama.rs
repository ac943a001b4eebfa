use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::provider::{missing_content, HttpEndpoint, LlmProvider};
use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct OllamaProvider {
    endpoint: HttpEndpoint,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str, client: Client) -> Self {
        Self {
            endpoint: HttpEndpoint::new(base_url, client),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct OllamaChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<(), ApiError> {
        self.endpoint.get_ok("/api/tags").await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let body = OllamaChatBody {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let payload = self.endpoint.post_json("/api/chat", &body).await?;
        payload["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| missing_content(self.name()))
    }
}
