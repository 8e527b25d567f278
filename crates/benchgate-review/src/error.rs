//! Error types for the review client.

use std::time::Duration;

/// Code-review API errors.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Token missing, invalid, or lacking access to the repository.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Repository, pull request or commit not found.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Network error or unexpected status.
    #[error("network error: {message}")]
    Network { message: String },

    /// Response body could not be decoded.
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ReviewError {
    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for ReviewError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for review API operations.
pub type ReviewResult<T> = Result<T, ReviewError>;
