//! Transport-level retry.
//!
//! Only connection failures and the configured server statuses are retried
//! here. HTTP 429 passes straight through so paged walks and chunked batches
//! can stop and keep what they already have.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

/// Statuses re-issued by default: request timeout and transient 5xx.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [408, 500, 502, 503, 504];

/// Wait between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles from `base` per retry, capped at `max`. With `jitter` the
    /// wait is drawn from 50%..150% of the doubled value.
    Exponential {
        base: Duration,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Wait before retry number `retry` (0 = first retry).
    pub fn wait(self, retry: u32) -> Duration {
        match self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max, jitter } => {
                let doubled = base.saturating_mul(2u32.saturating_pow(retry)).min(max);
                if !jitter {
                    return doubled;
                }
                let millis = doubled.as_millis() as u64;
                Duration::from_millis(millis / 2 + fastrand::u64(0..=millis))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first; `0` disables retrying.
    pub max_retries: u32,
    pub backoff: Backoff,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential(3)
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            backoff: Backoff::Fixed(delay),
            ..Self::exponential(max_retries)
        }
    }

    pub fn none() -> Self {
        Self::exponential(0)
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    fn retries(&self, outcome: &Result<HttpResponse, HttpError>) -> bool {
        match outcome {
            Ok(response) => self.retries_status(response.status),
            Err(error) => error.retryable(),
        }
    }
}

/// [`HttpClient`] decorator that re-issues failed requests per [`RetryConfig`].
///
/// After the last attempt the final response or error is returned as is.
#[derive(Clone)]
pub struct RetryingHttpClient {
    inner: Arc<dyn HttpClient>,
    config: RetryConfig,
}

impl RetryingHttpClient {
    pub fn new(inner: Arc<dyn HttpClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

impl HttpClient for RetryingHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut retry = 0;
            loop {
                let outcome = self.inner.execute(request.clone()).await;
                if !self.config.retries(&outcome) {
                    return outcome;
                }
                if retry >= self.config.max_retries {
                    warn!(
                        url = %redact(&request.url),
                        attempts = retry + 1,
                        "upstream still failing, giving up"
                    );
                    return outcome;
                }

                let wait = self.config.backoff.wait(retry);
                let reason = match &outcome {
                    Ok(response) => format!("HTTP {}", response.status),
                    Err(error) => error.message().to_owned(),
                };
                debug!(
                    url = %redact(&request.url),
                    retry = retry + 1,
                    wait_ms = wait.as_millis() as u64,
                    %reason,
                    "retrying upstream request"
                );
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
                retry += 1;
            }
        })
    }
}

/// Strips the query string, which may carry API keys, before logging a URL.
pub(crate) fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
