use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the backend name (e.g. "ollama", "llama.cpp", "vllm")
    fn name(&self) -> &str;

    /// check that the backend answers its health endpoint with 2xx
    async fn health_check(&self) -> Result<(), ApiError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError>;
}

/// HTTP plumbing shared by every backend.
#[derive(Clone)]
pub struct HttpEndpoint {
    base_url: String,
    client: Client,
}

impl HttpEndpoint {
    pub fn new(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let res = ensure_success(res).await?;
        res.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::internal(format!("failed to decode backend response: {e}"))
            }
        })
    }

    pub async fn get_ok(&self, path: &str) -> Result<(), ApiError> {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        ensure_success(res).await.map(|_| ())
    }
}

async fn ensure_success(res: Response) -> Result<Response, ApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    Err(ApiError::Upstream {
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn missing_content(backend: &str) -> ApiError {
    ApiError::Internal(format!("{} returned no content", backend))
}
