use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::{fetch_text, parse_json, BROWSER_USER_AGENT};
use crate::data_source::{FetchFuture, Provider, TickersFetcher, TickersOptions};
use crate::http_client::{HttpClient, HttpRequest};
use crate::normalize::{decode_record, normalize_batch, record_key, TickerFields};
use crate::provider_policy::ProviderPolicy;
use crate::{ProviderId, Ticker};

const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// SEC EDGAR company ticker file.
#[derive(Clone)]
pub struct SecAdapter {
    http_client: Arc<dyn HttpClient>,
    policy: ProviderPolicy,
    user_agent: String,
}

impl SecAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            policy: ProviderPolicy::sec_default(),
            user_agent: String::from(BROWSER_USER_AGENT),
        }
    }

    /// EDGAR asks automated clients to identify themselves.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Provider for SecAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Sec
    }

    fn policy(&self) -> &ProviderPolicy {
        &self.policy
    }

    fn tickers(&self) -> Option<&dyn TickersFetcher> {
        Some(self)
    }
}

impl TickersFetcher for SecAdapter {
    fn fetch_tickers<'a>(&'a self, options: &'a TickersOptions) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            if let Some(exchange) = &options.exchange {
                warn!(provider = "sec", %exchange, "exchange filter is not supported and is ignored");
            }
            info!(provider = "sec", url = COMPANY_TICKERS_URL, "downloading company tickers");

            let request = HttpRequest::get(COMPANY_TICKERS_URL)
                .with_header("user-agent", self.user_agent.as_str())
                .with_timeout_ms(self.policy.request_timeout_ms);
            let body = fetch_text(ProviderId::Sec, self.http_client.as_ref(), request).await?;
            let companies: BTreeMap<String, Value> = parse_json(ProviderId::Sec, &body)?;

            // Keys are row numbers as strings; order them numerically.
            let mut rows: Vec<(u64, Value)> = companies
                .into_iter()
                .map(|(key, company)| (key.parse().unwrap_or(u64::MAX), company))
                .collect();
            rows.sort_by_key(|(index, _)| *index);

            let normalized = normalize_batch(ProviderId::Sec, "ticker", rows, |(_, raw)| {
                let company: SecCompany = decode_record(record_key(&raw, "ticker"), raw)?;
                TickerFields {
                    symbol: company.ticker,
                    name: company.title,
                    active: Some(true),
                    cik: company.cik_str.map(|cik| cik.to_string()),
                    ..TickerFields::default()
                }
                .into_ticker()
            });
            info!(provider = "sec", total = normalized.records.len(), "parsed company tickers");
            Ok(normalized.into_records())
        })
    }
}

#[derive(Debug, Deserialize)]
struct SecCompany {
    #[serde(default)]
    cik_str: Option<u64>,
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::ScriptedHttpClient;

    #[tokio::test]
    async fn company_file_is_read_in_row_order_with_cik() {
        let body = r#"{
            "10": {"cik_str": 1067983, "ticker": "BRK-B", "title": "BERKSHIRE HATHAWAY INC"},
            "2": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"},
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "3": {"cik_str": 1, "title": "No Ticker Inc."}
        }"#;
        let http = Arc::new(ScriptedHttpClient::new().route("company_tickers.json", 200, body));
        let sec = SecAdapter::with_http_client(Arc::clone(&http) as Arc<dyn HttpClient>)
            .with_user_agent("marketfeed tests ops@example.test");

        let tickers = sec
            .fetch_tickers(&TickersOptions::new(Some(String::from("NYSE"))))
            .await
            .expect("tickers");

        let symbols: Vec<_> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "BRK-B"]);
        assert_eq!(tickers[0].cik.as_deref(), Some("320193"));
        assert!(tickers.iter().all(|t| t.active));
        assert_eq!(
            http.requests()[0].headers.get("user-agent").map(String::as_str),
            Some("marketfeed tests ops@example.test")
        );
    }

    #[tokio::test]
    async fn string_cik_skips_only_that_company() {
        let body = r#"{
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": "0000789019", "ticker": "MSFT", "title": "MICROSOFT CORP"},
            "2": {"cik_str": 1018724, "ticker": "AMZN", "title": "AMAZON COM INC"}
        }"#;
        let http = Arc::new(ScriptedHttpClient::new().route("company_tickers.json", 200, body));
        let sec = SecAdapter::with_http_client(http);

        let tickers = sec.fetch_tickers(&TickersOptions::default()).await.expect("tickers");

        let symbols: Vec<_> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "AMZN"]);
    }
}
