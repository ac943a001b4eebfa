use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::provider::{missing_content, HttpEndpoint, LlmProvider};
use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::ApiError;

const STOP_SEQUENCES: [&str; 2] = ["\nUser:", "\nSystem:"];

/// llama.cpp `server` speaking the raw `/completion` protocol.
#[derive(Clone)]
pub struct LlamaCppProvider {
    endpoint: HttpEndpoint,
}

impl LlamaCppProvider {
    pub fn new(base_url: &str, client: Client) -> Self {
        Self {
            endpoint: HttpEndpoint::new(base_url, client),
        }
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    prompt: String,
    n_predict: u32,
    temperature: f64,
    stop: &'a [&'a str],
}

/// Flattens a chat transcript into a role-prefixed prompt ending with an
/// open assistant turn.
pub fn render_prompt(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str(message.role.label());
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Assistant: ");
    prompt
}

#[async_trait]
impl LlmProvider for LlamaCppProvider {
    fn name(&self) -> &str {
        "llama.cpp"
    }

    async fn health_check(&self) -> Result<(), ApiError> {
        self.endpoint.get_ok("/health").await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let body = CompletionBody {
            prompt: render_prompt(&request.messages),
            n_predict: request.max_tokens,
            temperature: request.temperature,
            stop: &STOP_SEQUENCES,
        };

        let payload = self.endpoint.post_json("/completion", &body).await?;
        payload["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| missing_content(self.name()))
    }
}
