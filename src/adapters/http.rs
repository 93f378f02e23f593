use crate::domain::model::{ChatRequest, TransportResponse};
use crate::domain::ports::Transport;
use crate::utils::error::{DigestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Chat-completion transport over HTTPS.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    endpoint: String,
}

impl ReqwestTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn call(
        &self,
        credential: &str,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<TransportResponse> {
        tracing::debug!(
            "POST {} (model: {}, max_completion_tokens: {})",
            self.endpoint,
            request.model,
            request.max_completion_tokens
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        tracing::debug!("API response status: {}", status);

        // a connection dropped mid-body is worth another attempt
        let body = response
            .text()
            .await
            .map_err(|e| DigestError::RetryableRequestError {
                reason: format!("failed to read response body: {}", e),
            })?;

        Ok(TransportResponse { status, body })
    }
}
