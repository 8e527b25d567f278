//! HTTP layer: status mapping, retry, pagination.
//!
//! client/mod.rs never interprets status codes.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ReviewError, ReviewResult};

/// Page size requested from list endpoints.
pub(crate) const PER_PAGE: usize = 100;

/// Upper bound on pages fetched from one endpoint.
const MAX_PAGES: u32 = 50;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Doubling delay for the n-th retry, capped at `MAX_BACKOFF`.
fn exponential_backoff(retry: u32) -> Duration {
    let secs = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

const GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) token: String,
    pub(crate) max_retries: u32,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Fetch every page of a list endpoint.
    pub(crate) async fn get_all<T: DeserializeOwned>(&self, url: &str) -> ReviewResult<Vec<T>> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let sep = if url.contains('?') { '&' } else { '?' };
            let page_url = format!("{}{}per_page={}&page={}", url, sep, PER_PAGE, page);
            let batch: Vec<T> = self.get_json(&page_url).await?;
            let short = batch.len() < PER_PAGE;
            items.extend(batch);
            if short {
                return Ok(items);
            }
        }
        warn!(url = %url, pages = MAX_PAGES, "page limit reached; results truncated");
        Ok(items)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ReviewResult<T> {
        let response = self.request(url).await?;
        let body = response.text().await.map_err(|e| ReviewError::Network {
            message: format!("failed to read response body: {}", e),
        })?;
        serde_json::from_str(&body).map_err(|e| ReviewError::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// GET with retries on rate limits and transient failures.
    pub(crate) async fn request(&self, url: &str) -> ReviewResult<reqwest::Response> {
        use rand::Rng;

        let mut retries = 0;

        loop {
            match self.request_once(url).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;

                    let backoff = match &e {
                        ReviewError::RateLimited {
                            retry_after: Some(retry_after),
                        } => {
                            let capped = (*retry_after).min(MAX_BACKOFF);
                            let base_ms = capped.as_millis() as u64;
                            let jitter_factor: f64 =
                                rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
                            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
                            Duration::from_millis(jittered_ms.max(100))
                        }
                        _ => {
                            let base_backoff = exponential_backoff(retries);
                            let jittered_ms =
                                rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
                            Duration::from_millis(jittered_ms.max(10))
                        }
                    };

                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(&self, url: &str) -> ReviewResult<reqwest::Response> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(response),

            401 | 403 => Err(ReviewError::Unauthorized {
                message: format!("HTTP {} for {}", status.as_u16(), url),
            }),

            404 => Err(ReviewError::NotFound {
                url: url.to_string(),
            }),

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(ReviewError::RateLimited { retry_after })
            }

            _ => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(ReviewError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(exponential_backoff(1), Duration::from_secs(2));
        assert_eq!(exponential_backoff(4), Duration::from_secs(16));
        assert_eq!(exponential_backoff(5), MAX_BACKOFF);
    }

    #[test]
    fn test_backoff_large_retry_counts_do_not_overflow() {
        assert_eq!(exponential_backoff(63), MAX_BACKOFF);
        assert_eq!(exponential_backoff(64), MAX_BACKOFF);
        assert_eq!(exponential_backoff(u32::MAX), MAX_BACKOFF);
    }
}
