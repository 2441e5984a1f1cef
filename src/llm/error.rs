//! Error types for the text-generation capability.
//!
//! [`GenerationError`] covers rate limiting, API errors, network failures and
//! replies that carry no usable text. [`GenerationError::is_transient`] decides
//! whether a retry is worth attempting.

use thiserror::Error;

/// Errors that can occur while asking a model for the next utterance.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The server returned HTTP 429.
    /// `retry_after_ms` tells how long to wait before trying again.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Any other non-success HTTP status (401 bad key, 500 internal error, ...).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Underlying transport failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The model answered but produced no text blocks.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// No credential was configured for the generation backend.
    #[error("no API key configured (set ANTHROPIC_API_KEY or api_key in scriptorium.toml)")]
    MissingApiKey,
}

impl GenerationError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::RateLimited { .. } => true,
            GenerationError::ApiError { status, .. } => *status >= 500,
            GenerationError::NetworkError(_) => true,
            GenerationError::EmptyResponse | GenerationError::MissingApiKey => false,
        }
    }
}
