//! Shared fixtures for the behaviour tests: a scripted upstream and a
//! registry that records pauses instead of sleeping.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use marketfeed_core::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ProviderId, ProviderPolicy, ProviderRegistry,
    RecordingCooldown, RetryConfig,
};

/// Upstream double: the first route whose fragment occurs in the URL
/// answers; unrouted URLs get a 404. Every request is recorded.
#[derive(Default)]
pub struct FakeUpstream {
    routes: Vec<(String, Result<HttpResponse, HttpError>)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, fragment: &str, status: u16, body: &str) -> Self {
        self.routes
            .push((fragment.to_owned(), Ok(HttpResponse::new(status, body))));
        self
    }

    pub fn fail(mut self, fragment: &str, error: HttpError) -> Self {
        self.routes.push((fragment.to_owned(), Err(error)));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("request log").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("request log").len()
    }

    pub fn calls_to(&self, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.contains(fragment))
            .count()
    }
}

impl HttpClient for FakeUpstream {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let outcome = self
            .routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| Ok(HttpResponse::new(404, "not found")));
        self.requests.lock().expect("request log").push(request);
        Box::pin(async move { outcome })
    }
}

/// Registry over `upstream` whose retries never sleep; cooldowns keep
/// their production lengths but are only recorded.
pub fn registry(upstream: &Arc<FakeUpstream>, pacer: &Arc<RecordingCooldown>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::with_http_client(
        Arc::clone(upstream) as Arc<dyn HttpClient>,
        Arc::clone(pacer) as Arc<dyn marketfeed_core::Cooldown>,
    );
    for id in ProviderId::ALL {
        let mut policy = ProviderPolicy::default_for(id);
        policy.retry = RetryConfig::fixed(Duration::ZERO, 2);
        registry = registry.with_policy(policy);
    }
    registry
}

/// Environment lookup with both paid-provider credentials present.
pub fn credentials(key: &str) -> Option<String> {
    match key {
        "POLYGON_API_KEY" => Some(String::from("pk-secret-123")),
        "ALPHA_VANTAGE_API_KEY" => Some(String::from("av-secret-456")),
        _ => None,
    }
}

/// Environment lookup with nothing set.
pub fn no_credentials(_key: &str) -> Option<String> {
    None
}

/// Polygon reference-ticker page with `count` symbols starting at `start`.
pub fn polygon_ticker_page(start: usize, count: usize, next: Option<&str>) -> String {
    let results: Vec<String> = (start..start + count)
        .map(|index| {
            format!(r#"{{"ticker": "T{index}", "name": "Company {index}", "type": "CS", "active": true}}"#)
        })
        .collect();
    match next {
        Some(next) => format!(
            r#"{{"status": "OK", "results": [{}], "next_url": "{next}"}}"#,
            results.join(",")
        ),
        None => format!(r#"{{"status": "OK", "results": [{}]}}"#, results.join(",")),
    }
}

pub const CBOE_DIRECTORY: &str = "Company Name,Stock Symbol,DPM Name,Post/Station\n\
    Agilent Technologies,A,Citadel,1/1\n\
    Nano Labs,NA,Susquehanna,2/2\n\
    Apple Inc,AAPL,Citadel,3/3\n";

pub const SEC_COMPANIES: &str = r#"{
    "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
    "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"}
}"#;

pub const NASDAQ_LISTED: &str = "Symbol|Security Name|Market Category|Test Issue|Financial Status|Round Lot Size|ETF|NextShares\n\
    AAPL|Apple Inc. - Common Stock|Q|N|N|100|N|N\n\
    MSFT|Microsoft Corporation - Common Stock|Q|N|N|100|N|N\n\
    NA|Nano Labs Ltd - Class A|S|N|N|100|N|N\n\
    File Creation Time: 0102202418:01|||||||\n";

pub const AV_LISTING: &str = "symbol,name,exchange,assetType,ipoDate,delistingDate,status\r\n\
    IBM,International Business Machines Corp,NYSE,Stock,1962-01-02,null,Active\r\n\
    NA,Nano Labs Ltd,NASDAQ,Stock,2022-07-12,null,Active\r\n";

/// Yahoo v7 quote body for the given `(symbol, market cap)` pairs.
pub fn yahoo_quotes(quotes: &[(&str, u64)]) -> String {
    let results: Vec<String> = quotes
        .iter()
        .map(|(symbol, cap)| {
            format!(r#"{{"symbol": "{symbol}", "longName": "{symbol} Inc.", "marketCap": {cap}, "currency": "USD"}}"#)
        })
        .collect();
    format!(
        r#"{{"quoteResponse": {{"result": [{}], "error": null}}}}"#,
        results.join(",")
    )
}

/// Upstream answering the Yahoo cookie and crumb handshake.
pub fn yahoo_upstream() -> FakeUpstream {
    FakeUpstream::new()
        .route("fc.yahoo.com", 404, "")
        .route("/v1/test/getcrumb", 200, "crumb-abc")
}
