use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::error::GenerationError;
use super::retry::RetryConfig;
use super::types::{ConversationTurn, MessagesRequest, MessagesResponse};
use super::Generator;

pub const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Generation capability backed by the Anthropic Messages API.
pub struct AnthropicClient {
    api_key: String,
    client: Client,
    base_url: String,
    max_tokens: u32,
    retry: RetryConfig,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Result<Self, GenerationError> {
        Self::with_base_url(api_key, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url,
            max_tokens: 2048,
            retry: RetryConfig::default(),
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub async fn send_message(
        &self,
        req: &MessagesRequest,
    ) -> Result<MessagesResponse, GenerationError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(1000);
            return Err(GenerationError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GenerationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<MessagesResponse>().await?;
        Ok(body)
    }
}

#[async_trait]
impl Generator for AnthropicClient {
    async fn generate(
        &self,
        model: &str,
        conversation: &[ConversationTurn],
    ) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let req = MessagesRequest::from_conversation(model, self.max_tokens, conversation);
        let mut attempt = 0;
        loop {
            match self.send_message(&req).await {
                Ok(resp) => {
                    debug!(
                        model = %resp.model,
                        input_tokens = resp.usage.input_tokens,
                        output_tokens = resp.usage.output_tokens,
                        "Generation finished"
                    );
                    let text = resp.text();
                    if text.trim().is_empty() {
                        return Err(GenerationError::EmptyResponse);
                    }
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let backoff = self.retry.delay_for_attempt(attempt);
                    let delay_ms = match &e {
                        GenerationError::RateLimited { retry_after_ms } => {
                            (*retry_after_ms).max(backoff)
                        }
                        _ => backoff,
                    };
                    warn!(
                        attempt,
                        max = self.retry.max_retries,
                        delay_ms,
                        error = %e,
                        "Retrying generation"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
