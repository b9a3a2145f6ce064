//! Operations exposed to callers.
//!
//! Each operation checks the provider's capability before any upstream call,
//! then applies the propagation policy: fatal errors are returned, every
//! other failure is logged and degrades to an empty list.

use std::time::Duration;

use tracing::{error, info};

use crate::batch::normalize_symbols;
use crate::data_source::{
    CandlesFetcher, CandlesOptions, Capability, MetadataFetcher, MetadataOptions,
    OptionableFetcher, OptionableOptions, Provider, SourceError, TickersFetcher, TickersOptions,
};
use crate::enrich::{enrich, select_base};
use crate::normalize::dedupe_tickers;
use crate::{Candle, ProviderId, Ticker};

fn require_tickers(provider: &dyn Provider) -> Result<&dyn TickersFetcher, SourceError> {
    provider
        .tickers()
        .ok_or_else(|| SourceError::unsupported_capability(provider.id(), Capability::Tickers))
}

fn require_candles(provider: &dyn Provider) -> Result<&dyn CandlesFetcher, SourceError> {
    provider
        .candles()
        .ok_or_else(|| SourceError::unsupported_capability(provider.id(), Capability::Candles))
}

fn require_optionable(provider: &dyn Provider) -> Result<&dyn OptionableFetcher, SourceError> {
    provider
        .optionable()
        .ok_or_else(|| SourceError::unsupported_capability(provider.id(), Capability::Optionable))
}

fn require_metadata(provider: &dyn Provider) -> Result<&dyn MetadataFetcher, SourceError> {
    provider
        .metadata()
        .ok_or_else(|| SourceError::unsupported_capability(provider.id(), Capability::Metadata))
}

/// Returns fatal errors, logs anything else and substitutes an empty list.
fn degrade<T>(
    provider: ProviderId,
    capability: Capability,
    outcome: Result<Vec<T>, SourceError>,
) -> Result<Vec<T>, SourceError> {
    match outcome {
        Ok(records) => Ok(records),
        Err(error) if error.is_fatal() => Err(error),
        Err(error) => {
            error!(
                provider = %provider,
                capability = %capability,
                code = error.code(),
                "fetch failed, returning no records: {}",
                error.message()
            );
            Ok(Vec::new())
        }
    }
}

/// Lists tradable symbols, de-duplicated by symbol.
pub async fn list_tickers(
    provider: &dyn Provider,
    options: &TickersOptions,
) -> Result<Vec<Ticker>, SourceError> {
    let fetcher = require_tickers(provider)?;
    let tickers = degrade(provider.id(), Capability::Tickers, fetcher.fetch_tickers(options).await)?;
    let tickers = dedupe_tickers(provider.id(), tickers);
    info!(provider = %provider.id(), total = tickers.len(), "listed tickers");
    Ok(tickers)
}

/// Lists OHLCV bars for one symbol, oldest first.
pub async fn list_candles(
    provider: &dyn Provider,
    options: &CandlesOptions,
) -> Result<Vec<Candle>, SourceError> {
    let fetcher = require_candles(provider)?;
    let mut candles = degrade(provider.id(), Capability::Candles, fetcher.fetch_candles(options).await)?;
    candles.sort_by_key(|candle| candle.timestamp);
    info!(
        provider = %provider.id(),
        symbol = %options.symbol,
        interval = %options.interval,
        total = candles.len(),
        "listed candles"
    );
    Ok(candles)
}

/// Lists symbols with listed options.
pub async fn list_optionable(
    provider: &dyn Provider,
    options: &OptionableOptions,
) -> Result<Vec<Ticker>, SourceError> {
    let fetcher = require_optionable(provider)?;
    let tickers = degrade(
        provider.id(),
        Capability::Optionable,
        fetcher.fetch_optionable(options).await,
    )?;
    let mut tickers: Vec<Ticker> = dedupe_tickers(provider.id(), tickers)
        .into_iter()
        .map(|ticker| ticker.with_optionable(true))
        .collect();
    if let Some(max) = options.max_results {
        tickers.truncate(max);
    }
    info!(provider = %provider.id(), kind = %options.kind, total = tickers.len(), "listed optionable tickers");
    Ok(tickers)
}

/// Fetches metadata for `symbols`, returned in first-requested order.
///
/// Symbols are trimmed, comma-split, uppercased and de-duplicated first.
/// `chunk_size` and `delay` fall back to the provider's policy.
pub async fn fetch_metadata<S: AsRef<str>>(
    provider: &dyn Provider,
    symbols: &[S],
    chunk_size: Option<usize>,
    delay: Option<Duration>,
) -> Result<Vec<Ticker>, SourceError> {
    let fetcher = require_metadata(provider)?;
    let policy = provider.policy();
    let options = MetadataOptions::new(
        normalize_symbols(symbols),
        chunk_size.unwrap_or(policy.metadata_chunk_size),
        delay.unwrap_or(policy.metadata_delay),
    )?;
    info!(
        provider = %provider.id(),
        symbols = options.symbols.len(),
        chunk_size = options.chunk_size,
        delay_secs = options.delay.as_secs_f64(),
        "fetching metadata"
    );
    degrade(provider.id(), Capability::Metadata, fetcher.fetch_metadata(&options).await)
}

/// Lists tickers, then overlays metadata fetched for the first `limit` of them.
///
/// Both capabilities are checked up front. Tickers without metadata are
/// returned unchanged.
pub async fn enrich_tickers_with_metadata(
    provider: &dyn Provider,
    options: &TickersOptions,
    limit: Option<usize>,
    chunk_size: Option<usize>,
    delay: Option<Duration>,
) -> Result<Vec<Ticker>, SourceError> {
    require_tickers(provider)?;
    require_metadata(provider)?;

    let base = select_base(list_tickers(provider, options).await?, limit);
    if base.is_empty() {
        info!(provider = %provider.id(), "no tickers to enrich");
        return Ok(base);
    }

    let symbols: Vec<&str> = base.iter().map(|ticker| ticker.symbol.as_str()).collect();
    let metadata = fetch_metadata(provider, symbols.as_slice(), chunk_size, delay).await?;
    let enrichment = enrich(provider.id(), base, metadata);
    info!(
        provider = %provider.id(),
        total = enrichment.tickers.len(),
        unmatched = enrichment.unmatched.len(),
        "enriched tickers with metadata"
    );
    Ok(enrichment.tickers)
}
