use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::{fetch_text, parse_json, send, status_error};
use crate::batch::{ChunkSource, ChunkedFetcher};
use crate::data_source::{
    CandlesFetcher, CandlesOptions, FetchFuture, MetadataFetcher, MetadataOptions, OptionableFetcher,
    OptionableKind, OptionableOptions, Provider, SourceError, TickersFetcher, TickersOptions,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::normalize::{decode_record, normalize_batch, record_key, CandleFields, Rejection, TickerFields};
use crate::pacing::{Cooldown, TokioCooldown};
use crate::pagination::{Page, PageSource, Paginator};
use crate::provider_policy::ProviderPolicy;
use crate::{format_date, Candle, ProviderId, Symbol, Ticker};

const BASE_URL: &str = "https://api.polygon.io";
const MAX_CANDLE_LIMIT: u32 = 50_000;

/// Polygon.io REST adapter.
///
/// Listings walk `next_url` cursors one page at a time with the policy
/// cooldown between pages. The API key travels as a bearer token, so the
/// cursors returned by the API can be requested unchanged.
#[derive(Clone)]
pub struct PolygonAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    policy: ProviderPolicy,
    pacer: Arc<dyn Cooldown>,
    base_url: String,
}

impl PolygonAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            auth: HttpAuth::Bearer(api_key.into()),
            policy: ProviderPolicy::polygon_default(),
            pacer: Arc::new(TokioCooldown),
            base_url: String::from(BASE_URL),
        }
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cooldown(mut self, pacer: Arc<dyn Cooldown>) -> Self {
        self.pacer = pacer;
        self
    }

    fn request(&self, url: impl Into<String>) -> HttpRequest {
        HttpRequest::get(url)
            .with_auth(&self.auth)
            .with_timeout_ms(self.policy.request_timeout_ms)
    }

    fn paginator(&self) -> Paginator {
        Paginator::new(ProviderId::Polygon, self.policy.cooldown(), Arc::clone(&self.pacer))
    }

    fn tickers_url(&self, options: &TickersOptions) -> String {
        let mut url = format!(
            "{}/v3/reference/tickers?market=stocks&limit={}",
            self.base_url, self.policy.page_size
        );
        if let Some(exchange) = &options.exchange {
            url.push_str("&exchange=");
            url.push_str(&urlencoding::encode(exchange));
        }
        url
    }

    /// Fetches one listing page. Items stay raw so a malformed item is
    /// rejected on its own while the cursor is still followed.
    async fn list_page(&self, url: &str) -> Result<Page<Value>, SourceError> {
        let body = fetch_text(ProviderId::Polygon, self.http_client.as_ref(), self.request(url)).await?;
        let page: PolygonListResponse = parse_json(ProviderId::Polygon, &body)?;
        Ok(Page::new(page.results, page.next_url))
    }

    async fn ticker_details(&self, symbol: &Symbol) -> Result<Option<Ticker>, SourceError> {
        let url = format!(
            "{}/v3/reference/tickers/{}",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        );
        let response = send(ProviderId::Polygon, self.http_client.as_ref(), self.request(url)).await?;
        if response.status == 404 {
            warn!(provider = "polygon", symbol = %symbol, "ticker not found");
            return Ok(None);
        }
        if !response.is_success() {
            return Err(status_error(ProviderId::Polygon, &response));
        }

        let details: PolygonDetailsResponse = parse_json(ProviderId::Polygon, &response.body)?;
        let normalized = normalize_batch(ProviderId::Polygon, "metadata", details.results, |raw| {
            PolygonTicker::decode(raw)?.into_fields().into_ticker()
        });
        Ok(normalized.into_records().into_iter().next())
    }
}

impl Provider for PolygonAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Polygon
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

    fn optionable(&self) -> Option<&dyn OptionableFetcher> {
        Some(self)
    }

    fn metadata(&self) -> Option<&dyn MetadataFetcher> {
        Some(self)
    }
}

impl TickersFetcher for PolygonAdapter {
    fn fetch_tickers<'a>(&'a self, options: &'a TickersOptions) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            let pages = TickerPages {
                adapter: self,
                first_url: self.tickers_url(options),
            };
            let walk = self
                .paginator()
                .walk(&pages, |raw| PolygonTicker::decode(raw)?.into_fields().into_ticker())
                .await;
            let mut tickers = walk.into_result(ProviderId::Polygon)?;

            if let Some(excluded) = &options.exclude_type {
                let before = tickers.len();
                tickers.retain(|ticker| ticker.asset_type.as_deref() != Some(excluded.as_str()));
                info!(
                    provider = "polygon",
                    excluded = before - tickers.len(),
                    asset_type = %excluded,
                    "filtered tickers by asset type"
                );
            }
            info!(provider = "polygon", total = tickers.len(), "finished fetching tickers");
            Ok(tickers)
        })
    }
}

impl CandlesFetcher for PolygonAdapter {
    fn fetch_candles<'a>(&'a self, options: &'a CandlesOptions) -> FetchFuture<'a, Vec<Candle>> {
        Box::pin(async move {
            let url = format!(
                "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}?adjusted=true&sort=asc&limit={}",
                self.base_url,
                urlencoding::encode(options.symbol.as_str()),
                options.interval.multiplier,
                options.interval.timespan.as_str(),
                format_date(options.from),
                format_date(options.to),
                MAX_CANDLE_LIMIT
            );
            let body = fetch_text(ProviderId::Polygon, self.http_client.as_ref(), self.request(url)).await?;
            let aggregates: PolygonAggregatesResponse = parse_json(ProviderId::Polygon, &body)?;
            if aggregates.status.as_deref() == Some("ERROR") {
                return Err(SourceError::internal(format!(
                    "polygon aggregates error for {}: {}",
                    options.symbol,
                    aggregates.error.unwrap_or_default()
                )));
            }

            let normalized = normalize_batch(
                ProviderId::Polygon,
                "candle",
                aggregates.results.unwrap_or_default(),
                |raw| PolygonAggregate::decode(raw)?.into_fields().into_candle(),
            );
            Ok(normalized.into_records())
        })
    }
}

impl OptionableFetcher for PolygonAdapter {
    fn fetch_optionable<'a>(
        &'a self,
        options: &'a OptionableOptions,
    ) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            if options.kind != OptionableKind::All {
                return Err(SourceError::unsupported_parameter(format!(
                    "polygon does not support optionable type '{}'",
                    options.kind
                )));
            }
            if options.exchange.is_some() {
                warn!(provider = "polygon", "exchange filter is not applied to options contracts");
            }

            let pages = ContractPages {
                adapter: self,
                first_url: format!(
                    "{}/v3/reference/options/contracts?limit={}",
                    self.base_url, self.policy.page_size
                ),
                seen: Mutex::new(HashSet::new()),
            };
            let walk = self
                .paginator()
                .with_max_items(options.max_results)
                .walk(&pages, Ok)
                .await;
            let underlyings: BTreeSet<String> =
                walk.into_result(ProviderId::Polygon)?.into_iter().collect();
            info!(
                provider = "polygon",
                unique = underlyings.len(),
                "collected optionable underlyings"
            );

            let normalized = normalize_batch(ProviderId::Polygon, "ticker", underlyings, |symbol| {
                TickerFields {
                    active: Some(true),
                    optionable: Some(true),
                    ..TickerFields::symbol(symbol)
                }
                .into_ticker()
            });
            Ok(normalized.into_records())
        })
    }
}

impl MetadataFetcher for PolygonAdapter {
    fn fetch_metadata<'a>(&'a self, options: &'a MetadataOptions) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            info!(
                provider = "polygon",
                symbols = options.symbols.len(),
                delay_secs = options.delay.as_secs_f64(),
                "fetching ticker details"
            );
            ChunkedFetcher::new(ProviderId::Polygon, Arc::clone(&self.pacer))
                .run(self, options)
                .await
                .into_result()
        })
    }
}

/// Polygon has no multi-symbol details endpoint; a chunk is served by one
/// details call per symbol, paced by the policy cooldown.
impl ChunkSource for PolygonAdapter {
    fn fetch_chunk<'a>(&'a self, symbols: &'a [Symbol]) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            let mut found = Vec::with_capacity(symbols.len());
            let mut last_error = None;

            for (index, symbol) in symbols.iter().enumerate() {
                if index > 0 {
                    self.pacer.pause(self.policy.cooldown()).await;
                }
                match self.ticker_details(symbol).await {
                    Ok(Some(ticker)) => found.push(ticker),
                    Ok(None) => {}
                    Err(error) => {
                        warn!(
                            provider = "polygon",
                            symbol = %symbol,
                            code = error.code(),
                            "ticker details failed: {}",
                            error.message()
                        );
                        last_error = Some(error);
                    }
                }
            }

            match last_error {
                Some(error) if found.is_empty() => Err(error),
                _ => Ok(found),
            }
        })
    }
}

struct TickerPages<'a> {
    adapter: &'a PolygonAdapter,
    first_url: String,
}

impl PageSource for TickerPages<'_> {
    type Raw = Value;

    fn fetch_page<'a>(&'a self, cursor: Option<&'a str>) -> FetchFuture<'a, Page<Value>> {
        Box::pin(async move {
            self.adapter
                .list_page(cursor.unwrap_or(&self.first_url))
                .await
        })
    }

    fn entity(&self) -> &'static str {
        "ticker"
    }
}

/// Options contracts reduced to underlying symbols not seen on earlier pages.
struct ContractPages<'a> {
    adapter: &'a PolygonAdapter,
    first_url: String,
    seen: Mutex<HashSet<String>>,
}

impl PageSource for ContractPages<'_> {
    type Raw = String;

    fn fetch_page<'a>(&'a self, cursor: Option<&'a str>) -> FetchFuture<'a, Page<String>> {
        Box::pin(async move {
            let page = self
                .adapter
                .list_page(cursor.unwrap_or(&self.first_url))
                .await?;
            let mut seen = self
                .seen
                .lock()
                .map_err(|_| SourceError::internal("contract de-duplication state poisoned"))?;
            let fresh = page
                .items
                .into_iter()
                .filter_map(|raw| match decode_record::<PolygonContract>(record_key(&raw, "ticker"), raw) {
                    Ok(contract) => contract.underlying_ticker,
                    Err(rejection) => {
                        warn!(
                            provider = "polygon",
                            key = %rejection.key,
                            error = %rejection.error,
                            "skipping invalid options contract record"
                        );
                        None
                    }
                })
                .map(|symbol| symbol.trim().to_owned())
                .filter(|symbol| !symbol.is_empty() && seen.insert(symbol.clone()))
                .collect();
            Ok(Page::new(fresh, page.next))
        })
    }

    fn entity(&self) -> &'static str {
        "options contract"
    }
}

#[derive(Debug, Deserialize)]
struct PolygonListResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolygonDetailsResponse {
    #[serde(default)]
    results: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolygonTicker {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    primary_exchange: Option<String>,
    #[serde(rename = "type", default)]
    asset_type: Option<String>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    currency_name: Option<String>,
    #[serde(default)]
    cik: Option<String>,
    #[serde(default)]
    last_updated_utc: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
}

impl PolygonTicker {
    fn decode(raw: Value) -> Result<Self, Rejection> {
        decode_record(record_key(&raw, "ticker"), raw)
    }

    fn into_fields(self) -> TickerFields {
        TickerFields {
            symbol: self.ticker,
            name: self.name,
            // The reference endpoints list active tickers unless asked otherwise.
            active: Some(self.active.unwrap_or(true)),
            market: self.market,
            locale: self.locale,
            primary_exchange: self.primary_exchange,
            asset_type: self.asset_type,
            currency: self.currency_name,
            cik: self.cik,
            last_updated_utc: self.last_updated_utc,
            optionable: None,
            market_cap: self.market_cap,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PolygonContract {
    #[serde(default)]
    underlying_ticker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolygonAggregatesResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct PolygonAggregate {
    #[serde(default)]
    o: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    l: Option<f64>,
    #[serde(default)]
    c: Option<f64>,
    #[serde(default)]
    v: Option<f64>,
    #[serde(default)]
    t: Option<i64>,
}

impl PolygonAggregate {
    fn decode(raw: Value) -> Result<Self, Rejection> {
        decode_record(record_key(&raw, "t"), raw)
    }

    fn into_fields(self) -> CandleFields {
        CandleFields {
            key: self
                .t
                .map(|t| t.to_string())
                .unwrap_or_else(|| String::from("<missing timestamp>")),
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
            timestamp: self.t,
        }
    }
}
