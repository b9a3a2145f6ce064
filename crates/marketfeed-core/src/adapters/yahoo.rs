use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::Value;
use time::Duration as CalendarSpan;
use tracing::{debug, error, info, warn};

use crate::adapters::{fetch_text, parse_json, send, status_error};
use crate::batch::{ChunkSource, ChunkedFetcher};
use crate::data_source::{
    CandlesFetcher, CandlesOptions, FetchFuture, MetadataFetcher, MetadataOptions, OptionableFetcher,
    OptionableKind, OptionableOptions, Provider, SourceError, TickersFetcher, TickersOptions,
};
use crate::delimited::DelimitedTable;
use crate::http_client::{HttpClient, HttpRequest};
use crate::normalize::{decode_record, normalize_batch, record_key, CandleFields, Rejection, TickerFields};
use crate::pacing::{Cooldown, TokioCooldown};
use crate::provider_policy::ProviderPolicy;
use crate::{
    date_to_epoch_ms, epoch_seconds_to_ms, Candle, ProviderId, Symbol, Ticker, Timespan,
    ValidationError,
};

const QUERY_HOST: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const REFERER: &str = "https://finance.yahoo.com/";
const FOOTER_PREFIX: &str = "File Creation Time";
const PROGRESS_EVERY: usize = 100;

/// NASDAQ Trader symbol directory backing the ticker listing.
struct Directory {
    name: &'static str,
    url: &'static str,
    symbol_column: &'static str,
}

const DIRECTORIES: [Directory; 2] = [
    Directory {
        name: "nasdaq",
        url: "https://www.nasdaqtrader.com/dynamic/SymDir/nasdaqlisted.txt",
        symbol_column: "Symbol",
    },
    Directory {
        name: "other",
        url: "https://www.nasdaqtrader.com/dynamic/SymDir/otherlisted.txt",
        symbol_column: "ACT Symbol",
    },
];

/// Cookie and crumb handshake for the quote and options endpoints.
///
/// The session cookie lives in the HTTP client's jar; only the crumb is
/// cached here, for the lifetime of the adapter.
#[derive(Default)]
struct CrumbCache {
    crumb: Mutex<Option<String>>,
}

impl CrumbCache {
    fn cached(&self) -> Option<String> {
        self.crumb.lock().ok().and_then(|guard| guard.clone())
    }

    fn store(&self, crumb: String) {
        if let Ok(mut guard) = self.crumb.lock() {
            *guard = Some(crumb);
        }
    }

    fn invalidate(&self) {
        if let Ok(mut guard) = self.crumb.lock() {
            *guard = None;
        }
    }

    async fn get(&self, http_client: &dyn HttpClient, timeout_ms: u64) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached() {
            return Ok(crumb);
        }

        // fc.yahoo.com answers 404 but sets the session cookie.
        let cookie_request = HttpRequest::get(COOKIE_URL)
            .with_header("referer", REFERER)
            .with_timeout_ms(timeout_ms);
        if let Err(error) = send(ProviderId::Yfinance, http_client, cookie_request).await {
            debug!(provider = "yfinance", "cookie request failed: {}", error.message());
        }

        let crumb_request = HttpRequest::get(format!("{QUERY_HOST}/v1/test/getcrumb"))
            .with_header("referer", REFERER)
            .with_timeout_ms(timeout_ms);
        let response = send(ProviderId::Yfinance, http_client, crumb_request).await?;
        if !response.is_success() {
            return Err(status_error(ProviderId::Yfinance, &response));
        }

        let crumb = response.body.trim();
        if crumb.is_empty() || crumb.len() > 100 || crumb.contains('<') || crumb.contains(' ') {
            return Err(SourceError::internal("yfinance returned an unusable crumb"));
        }
        self.store(crumb.to_owned());
        Ok(crumb.to_owned())
    }
}

/// Yahoo Finance adapter ("yfinance").
///
/// Tickers come from the NASDAQ Trader directories; candles from the v8
/// chart API; optionable status from a per-symbol options probe; metadata
/// from the batched v7 quote endpoint.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    policy: ProviderPolicy,
    pacer: Arc<dyn Cooldown>,
    crumbs: Arc<CrumbCache>,
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            policy: ProviderPolicy::yfinance_default(),
            pacer: Arc::new(TokioCooldown),
            crumbs: Arc::new(CrumbCache::default()),
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

    async fn crumb(&self) -> Result<String, SourceError> {
        self.crumbs
            .get(self.http_client.as_ref(), self.policy.request_timeout_ms)
            .await
    }

    fn query_request(&self, url: String) -> HttpRequest {
        HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_timeout_ms(self.policy.request_timeout_ms)
    }

    async fn directory_tickers(&self, directory: &Directory) -> Result<Vec<Ticker>, SourceError> {
        info!(provider = "yfinance", directory = directory.name, "fetching symbol directory");
        let request = HttpRequest::get(directory.url).with_timeout_ms(self.policy.request_timeout_ms);
        let body = fetch_text(ProviderId::Yfinance, self.http_client.as_ref(), request).await?;
        let table = DelimitedTable::parse(&body, b'|').map_err(|error| {
            SourceError::internal(format!("failed to parse {} directory: {error}", directory.name))
        })?;

        let has_status = table.headers().iter().any(|h| h == "Financial Status");
        let rows = table
            .rows()
            .filter(|row| !row.first().is_some_and(|cell| cell.starts_with(FOOTER_PREFIX)));
        let normalized = normalize_batch(ProviderId::Yfinance, "ticker", rows, |row| {
            TickerFields {
                symbol: row.owned(directory.symbol_column),
                name: row.owned("Security Name"),
                active: Some(!has_status || row.get("Financial Status") == Some("N")),
                ..TickerFields::default()
            }
            .into_ticker()
        });
        Ok(normalized.into_records())
    }

    /// True when the symbol lists at least one option expiration.
    async fn has_options(&self, symbol: &Symbol, crumb: &str) -> bool {
        let url = format!(
            "{QUERY_HOST}/v7/finance/options/{}?crumb={}",
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(crumb)
        );
        let body = match fetch_text(ProviderId::Yfinance, self.http_client.as_ref(), self.query_request(url)).await {
            Ok(body) => body,
            Err(error) => {
                debug!(provider = "yfinance", %symbol, "options probe failed: {}", error.message());
                return false;
            }
        };
        match parse_json::<OptionChainResponse>(ProviderId::Yfinance, &body) {
            Ok(chain) => chain
                .option_chain
                .result
                .first()
                .is_some_and(|result| !result.expiration_dates.is_empty()),
            Err(error) => {
                debug!(provider = "yfinance", %symbol, "options probe unreadable: {}", error.message());
                false
            }
        }
    }

    async fn quote_chunk(&self, symbols: &[Symbol]) -> Result<Vec<Ticker>, SourceError> {
        let joined = symbols.iter().map(Symbol::as_str).collect::<Vec<_>>().join(",");
        let mut refreshed = false;

        loop {
            let crumb = self.crumb().await?;
            let url = format!(
                "{QUERY_HOST}/v7/finance/quote?symbols={}&crumb={}",
                urlencoding::encode(&joined),
                urlencoding::encode(&crumb)
            );
            let response = send(ProviderId::Yfinance, self.http_client.as_ref(), self.query_request(url)).await?;

            if response.status == 401 && !refreshed {
                debug!(provider = "yfinance", "crumb rejected, refreshing");
                self.crumbs.invalidate();
                refreshed = true;
                continue;
            }
            if !response.is_success() {
                return Err(status_error(ProviderId::Yfinance, &response));
            }

            let quotes: QuoteResponse = parse_json(ProviderId::Yfinance, &response.body)?;
            let normalized = normalize_batch(
                ProviderId::Yfinance,
                "metadata",
                quotes.quote_response.result,
                |raw| {
                    decode_record::<QuoteData>(record_key(&raw, "symbol"), raw)?
                        .into_fields()
                        .into_ticker()
                },
            );
            return Ok(normalized.into_records());
        }
    }
}

impl Provider for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yfinance
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

impl TickersFetcher for YahooAdapter {
    fn fetch_tickers<'a>(&'a self, options: &'a TickersOptions) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            let wanted: Vec<String> = match &options.exchange {
                Some(exchange) => vec![exchange.to_ascii_lowercase()],
                None => {
                    info!(provider = "yfinance", "no exchange given, fetching every directory");
                    DIRECTORIES.iter().map(|d| d.name.to_owned()).collect()
                }
            };

            let mut tickers = Vec::new();
            for name in &wanted {
                let Some(directory) = DIRECTORIES.iter().find(|d| d.name == name.as_str()) else {
                    warn!(provider = "yfinance", exchange = %name, "unknown directory, skipping");
                    continue;
                };
                match self.directory_tickers(directory).await {
                    Ok(listed) => tickers.extend(listed),
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => error!(
                        provider = "yfinance",
                        directory = directory.name,
                        code = error.code(),
                        "directory fetch failed: {}",
                        error.message()
                    ),
                }
            }
            Ok(tickers)
        })
    }
}

impl CandlesFetcher for YahooAdapter {
    fn fetch_candles<'a>(&'a self, options: &'a CandlesOptions) -> FetchFuture<'a, Vec<Candle>> {
        Box::pin(async move {
            let unit = match options.interval.timespan {
                Timespan::Minute => "m",
                Timespan::Hour => "h",
                Timespan::Day => "d",
                Timespan::Week => "wk",
                Timespan::Month => "mo",
            };
            // period2 is exclusive; extend it to cover the whole end date.
            let period1 = date_to_epoch_ms(options.from) / 1_000;
            let period2 = date_to_epoch_ms(options.to + CalendarSpan::days(1)) / 1_000;
            let url = format!(
                "{QUERY_HOST}/v8/finance/chart/{}?period1={period1}&period2={period2}&interval={}{unit}&events=history",
                urlencoding::encode(options.symbol.as_str()),
                options.interval.multiplier
            );

            let body = fetch_text(ProviderId::Yfinance, self.http_client.as_ref(), self.query_request(url)).await?;
            let chart: ChartResponse = parse_json(ProviderId::Yfinance, &body)?;
            if let Some(error) = chart.chart.error.filter(|value| !value.is_null()) {
                return Err(SourceError::internal(format!(
                    "yfinance chart error for {}: {error}",
                    options.symbol
                )));
            }
            let Some(result) = chart.chart.result.and_then(|results| results.into_iter().next()) else {
                return Ok(Vec::new());
            };
            let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
            let timestamps = result.timestamp.unwrap_or_default();

            let normalized = normalize_batch(
                ProviderId::Yfinance,
                "candle",
                timestamps.into_iter().enumerate(),
                |(index, raw)| quote.row(index, &raw)?.into_candle(),
            );
            Ok(normalized.into_records())
        })
    }
}

impl OptionableFetcher for YahooAdapter {
    fn fetch_optionable<'a>(
        &'a self,
        options: &'a OptionableOptions,
    ) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            if options.kind != OptionableKind::All {
                return Err(SourceError::unsupported_parameter(format!(
                    "yfinance does not support optionable type '{}'",
                    options.kind
                )));
            }
            let delay = options.delay.unwrap_or(self.policy.probe_delay);
            info!(
                provider = "yfinance",
                delay_secs = delay.as_secs_f64(),
                "starting options availability scan"
            );

            let mut candidates = self
                .fetch_tickers(&TickersOptions::new(options.exchange.clone()))
                .await?;
            if let Some(max) = options.max_results {
                candidates.truncate(max);
                info!(provider = "yfinance", max, "limited scan to the first tickers");
            }
            if candidates.is_empty() {
                return Ok(Vec::new());
            }

            let crumb = self.crumb().await?;
            let total = candidates.len();
            let mut optionable = Vec::new();
            for (index, ticker) in candidates.into_iter().enumerate() {
                let checked = index + 1;
                if checked % PROGRESS_EVERY == 0 {
                    info!(
                        provider = "yfinance",
                        checked,
                        total,
                        found = optionable.len(),
                        "options scan progress"
                    );
                }
                if self.has_options(&ticker.symbol, &crumb).await {
                    debug!(provider = "yfinance", symbol = %ticker.symbol, "optionable");
                    optionable.push(ticker.with_optionable(true));
                }
                if checked < total {
                    self.pacer.pause(delay).await;
                }
            }

            info!(
                provider = "yfinance",
                found = optionable.len(),
                checked = total,
                "options scan finished"
            );
            Ok(optionable)
        })
    }
}

impl MetadataFetcher for YahooAdapter {
    fn fetch_metadata<'a>(&'a self, options: &'a MetadataOptions) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            ChunkedFetcher::new(ProviderId::Yfinance, Arc::clone(&self.pacer))
                .run(self, options)
                .await
                .into_result()
        })
    }
}

impl ChunkSource for YahooAdapter {
    fn fetch_chunk<'a>(&'a self, symbols: &'a [Symbol]) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(self.quote_chunk(symbols))
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<Value>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

/// Column-oriented bar series; cells stay raw so one bad cell only
/// rejects its own row.
#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Value>,
    #[serde(default)]
    high: Vec<Value>,
    #[serde(default)]
    low: Vec<Value>,
    #[serde(default)]
    close: Vec<Value>,
    #[serde(default)]
    volume: Vec<Value>,
}

impl ChartQuote {
    fn row(&self, index: usize, timestamp: &Value) -> Result<CandleFields, Rejection> {
        let key = timestamp.to_string();
        let cells = || -> Result<CandleFields, ValidationError> {
            let seconds = timestamp
                .as_i64()
                .ok_or_else(|| ValidationError::InvalidTimestamp { value: timestamp.to_string() })?;
            Ok(CandleFields {
                key: key.clone(),
                open: chart_cell("open", &self.open, index)?,
                high: chart_cell("high", &self.high, index)?,
                low: chart_cell("low", &self.low, index)?,
                close: chart_cell("close", &self.close, index)?,
                volume: chart_cell("volume", &self.volume, index)?,
                timestamp: Some(epoch_seconds_to_ms(seconds)?),
            })
        };
        cells().map_err(|error| Rejection::new(key.clone(), error))
    }
}

/// `null` or a short series is a gap; any non-number is a bad value.
fn chart_cell(field: &'static str, series: &[Value], index: usize) -> Result<Option<f64>, ValidationError> {
    match series.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| ValidationError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct OptionChainResponse {
    #[serde(rename = "optionChain")]
    option_chain: OptionChainEnvelope,
}

#[derive(Debug, Deserialize)]
struct OptionChainEnvelope {
    #[serde(default)]
    result: Vec<OptionChainResult>,
}

#[derive(Debug, Deserialize)]
struct OptionChainResult {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteEnvelope,
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(default)]
    result: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteData {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    quote_type: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
}

impl QuoteData {
    fn into_fields(self) -> TickerFields {
        TickerFields {
            symbol: self.symbol,
            name: self.long_name.or(self.short_name),
            active: Some(true),
            market: self.market,
            primary_exchange: self.exchange,
            asset_type: self.quote_type,
            currency: self.currency,
            market_cap: self.market_cap,
            ..TickerFields::default()
        }
    }
}
