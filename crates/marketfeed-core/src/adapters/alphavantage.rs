use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::Duration as CalendarSpan;
use tracing::{info, warn};

use crate::adapters::{fetch_text, parse_json};
use crate::data_source::{
    CandlesFetcher, CandlesOptions, FetchFuture, Provider, SourceError, TickersFetcher,
    TickersOptions,
};
use crate::delimited::DelimitedTable;
use crate::http_client::{HttpClient, HttpRequest};
use crate::normalize::{daily_text_row, decode_record, normalize_batch, TickerFields};
use crate::provider_policy::ProviderPolicy;
use crate::{format_date, today_utc, Candle, ProviderId, Ticker, Timespan};

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// `compact` responses carry the latest 100 trading days; ranges starting
/// further back than this many calendar days need `full`.
const COMPACT_WINDOW_DAYS: i64 = 140;

/// Alpha Vantage adapter: listing-status directory and daily series.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    policy: ProviderPolicy,
    base_url: String,
}

impl AlphaVantageAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            policy: ProviderPolicy::alpha_vantage_default(),
            base_url: String::from(BASE_URL),
        }
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn request(&self, query: &str) -> HttpRequest {
        HttpRequest::get(format!(
            "{}?{}&apikey={}",
            self.base_url,
            query,
            urlencoding::encode(&self.api_key)
        ))
        .with_timeout_ms(self.policy.request_timeout_ms)
    }

    async fn query(&self, query: &str) -> Result<String, SourceError> {
        let body = fetch_text(ProviderId::AlphaVantage, self.http_client.as_ref(), self.request(query)).await?;
        reject_service_message(&body)?;
        Ok(body)
    }
}

impl Provider for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::AlphaVantage
    }

    fn policy(&self) -> &ProviderPolicy {
        &self.policy
    }

    fn tickers(&self) -> Option<&dyn TickersFetcher> {
        Some(self)
    }

    fn candles(&self) -> Option<&dyn CandlesFetcher> {
        Some(self)
    }
}

impl TickersFetcher for AlphaVantageAdapter {
    fn fetch_tickers<'a>(&'a self, options: &'a TickersOptions) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            let body = self.query("function=LISTING_STATUS").await?;
            let table = DelimitedTable::parse(&body, b',').map_err(|error| {
                SourceError::internal(format!("failed to parse alpha_vantage listing: {error}"))
            })?;

            let exchange = options.exchange.as_deref();
            let rows = table.rows().filter(|row| match exchange {
                Some(wanted) => row
                    .get("exchange")
                    .is_some_and(|value| value.eq_ignore_ascii_case(wanted)),
                None => true,
            });
            let normalized = normalize_batch(ProviderId::AlphaVantage, "ticker", rows, |row| {
                TickerFields {
                    symbol: row.owned("symbol"),
                    name: row.owned("name"),
                    active: Some(row.get("status") == Some("Active")),
                    primary_exchange: row.owned("exchange"),
                    asset_type: row.owned("assetType"),
                    ..TickerFields::default()
                }
                .into_ticker()
            });

            info!(
                provider = "alpha_vantage",
                total = normalized.records.len(),
                exchange = exchange.unwrap_or("all"),
                "parsed listing status"
            );
            Ok(normalized.into_records())
        })
    }
}

impl CandlesFetcher for AlphaVantageAdapter {
    fn fetch_candles<'a>(&'a self, options: &'a CandlesOptions) -> FetchFuture<'a, Vec<Candle>> {
        Box::pin(async move {
            if options.interval.timespan != Timespan::Day || options.interval.multiplier != 1 {
                return Err(SourceError::unsupported_parameter(format!(
                    "alpha_vantage only serves daily bars, got '{}'",
                    options.interval
                )));
            }

            let output_size = if options.from < today_utc() - CalendarSpan::days(COMPACT_WINDOW_DAYS) {
                "full"
            } else {
                "compact"
            };
            let body = self
                .query(&format!(
                    "function=TIME_SERIES_DAILY&symbol={}&outputsize={output_size}",
                    urlencoding::encode(options.symbol.as_str())
                ))
                .await?;
            let response: DailySeriesResponse = parse_json(ProviderId::AlphaVantage, &body)?;
            let Some(series) = response.series else {
                warn!(provider = "alpha_vantage", symbol = %options.symbol, "response has no daily series");
                return Ok(Vec::new());
            };

            let from = format_date(options.from);
            let to = format_date(options.to);
            // BTreeMap iteration over ISO dates is oldest first.
            let rows = series
                .into_iter()
                .filter(|(date, _)| date.as_str() >= from.as_str() && date.as_str() <= to.as_str());
            let normalized = normalize_batch(ProviderId::AlphaVantage, "candle", rows, |(date, raw)| {
                let bar: BTreeMap<String, String> = decode_record(date.as_str(), raw)?;
                let volume = bar
                    .get("5. volume")
                    .or_else(|| bar.get("6. volume"))
                    .map(String::as_str)
                    .unwrap_or("");
                daily_text_row(
                    &date,
                    field(&bar, "1. open"),
                    field(&bar, "2. high"),
                    field(&bar, "3. low"),
                    field(&bar, "4. close"),
                    volume,
                )
                .and_then(|fields| fields.into_candle())
            });
            Ok(normalized.into_records())
        })
    }
}

fn field<'b>(bar: &'b BTreeMap<String, String>, name: &str) -> &'b str {
    bar.get(name).map(String::as_str).unwrap_or("")
}

/// Alpha Vantage answers throttled or invalid calls with HTTP 200 and a
/// JSON message instead of data.
fn reject_service_message(body: &str) -> Result<(), SourceError> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return Ok(());
    }
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) else {
        return Ok(());
    };
    for key in ["Note", "Information"] {
        if let Some(message) = map.get(key).and_then(Value::as_str) {
            return Err(SourceError::rate_limited(format!("alpha_vantage: {message}")));
        }
    }
    if let Some(message) = map.get("Error Message").and_then(Value::as_str) {
        return Err(SourceError::internal(format!("alpha_vantage: {message}")));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)", default)]
    series: Option<BTreeMap<String, Value>>,
}
