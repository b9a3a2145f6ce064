//! Upstream provider adapters.
//!
//! | Adapter | Provider | Capabilities |
//! |---------|----------|--------------|
//! | [`PolygonAdapter`] | `polygon` | tickers, candles, optionable, metadata |
//! | [`AlphaVantageAdapter`] | `alpha_vantage` | tickers, candles |
//! | [`YahooAdapter`] | `yfinance` | tickers, candles, optionable, metadata |
//! | [`SecAdapter`] | `sec` | tickers |
//! | [`CboeAdapter`] | `cboe` | optionable |

mod alphavantage;
mod cboe;
mod polygon;
mod sec;
mod yahoo;

pub use alphavantage::AlphaVantageAdapter;
pub use cboe::CboeAdapter;
pub use polygon::PolygonAdapter;
pub use sec::SecAdapter;
pub use yahoo::YahooAdapter;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::retry::redact;
use crate::ProviderId;

/// Browser-like agent for public download endpoints that reject library agents.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// Issues `request` and returns the raw response, mapping transport failures.
pub(crate) async fn send(
    provider: ProviderId,
    http_client: &dyn HttpClient,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    debug!(provider = %provider, url = %redact(&request.url), "upstream request");
    http_client
        .execute(request)
        .await
        .map_err(|error| transport_error(provider, &error))
}

/// Issues `request` and returns the body of a successful response.
pub(crate) async fn fetch_text(
    provider: ProviderId,
    http_client: &dyn HttpClient,
    request: HttpRequest,
) -> Result<String, SourceError> {
    let response = send(provider, http_client, request).await?;
    if !response.is_success() {
        return Err(status_error(provider, &response));
    }
    Ok(response.body)
}

pub(crate) fn parse_json<T: DeserializeOwned>(provider: ProviderId, body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body)
        .map_err(|error| SourceError::internal(format!("failed to parse {provider} response: {error}")))
}

pub(crate) fn transport_error(provider: ProviderId, error: &HttpError) -> SourceError {
    if error.retryable() {
        SourceError::transport(format!("{provider} transport error: {}", error.message()))
    } else {
        SourceError::internal(format!("{provider} transport error: {}", error.message()))
    }
}

/// Classifies a non-success status.
///
/// 429 is a rate-limit signal for the pacing engines; 400/401/403 mean the
/// request or its credential is wrong and retrying cannot help.
pub(crate) fn status_error(provider: ProviderId, response: &HttpResponse) -> SourceError {
    let snippet: String = response.body.chars().take(200).collect();
    match response.status {
        429 => SourceError::rate_limited(format!("{provider} returned HTTP 429")),
        400 | 401 | 403 => SourceError::invalid_request(format!(
            "{provider} rejected the request with HTTP {}: {snippet}",
            response.status
        )),
        status if status >= 500 => {
            SourceError::transport(format!("{provider} returned HTTP {status}"))
        }
        status => SourceError::internal(format!("{provider} returned HTTP {status}: {snippet}")),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for adapter unit tests.

    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

    /// Answers each request with the first route whose fragment occurs in
    /// the URL, and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedHttpClient {
        routes: Vec<(String, Result<HttpResponse, HttpError>)>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn route(mut self, fragment: &str, status: u16, body: &str) -> Self {
            self.routes
                .push((fragment.to_owned(), Ok(HttpResponse::new(status, body))));
            self
        }

        pub(crate) fn fail(mut self, fragment: &str, error: HttpError) -> Self {
            self.routes.push((fragment.to_owned(), Err(error)));
            self
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().expect("request log").clone()
        }

        pub(crate) fn urls(&self) -> Vec<String> {
            self.requests().into_iter().map(|request| request.url).collect()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let outcome = self
                .routes
                .iter()
                .find(|(fragment, _)| request.url.contains(fragment.as_str()))
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "no scripted route")));
            self.requests.lock().expect("request log").push(request);
            Box::pin(async move { outcome })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;

    #[test]
    fn statuses_map_to_error_kinds() {
        let kind = |status| status_error(ProviderId::Polygon, &HttpResponse::new(status, "")).kind();

        assert_eq!(kind(429), SourceErrorKind::RateLimited);
        assert_eq!(kind(401), SourceErrorKind::InvalidRequest);
        assert_eq!(kind(503), SourceErrorKind::Transport);
        assert_eq!(kind(404), SourceErrorKind::Internal);
    }

    #[test]
    fn non_retryable_transport_failures_are_internal() {
        let error = transport_error(ProviderId::Sec, &HttpError::non_retryable("bad url"));
        assert_eq!(error.kind(), SourceErrorKind::Internal);
        let error = transport_error(ProviderId::Sec, &HttpError::new("reset"));
        assert_eq!(error.kind(), SourceErrorKind::Transport);
    }
}
