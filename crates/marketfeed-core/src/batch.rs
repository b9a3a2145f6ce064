//! Chunked multi-symbol fetches with inter-chunk delay.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::data_source::{FetchFuture, MetadataOptions, SourceError};
use crate::pacing::Cooldown;
use crate::{ProviderId, Symbol, Ticker};

/// Number of symbols quoted in aggregated "missing" warnings.
pub const MISSING_SAMPLE: usize = 10;

/// Splits comma-joined entries, trims, uppercases and de-duplicates
/// symbols in first-seen order. Entries that are not valid symbols are
/// dropped with a warning.
pub fn normalize_symbols<S: AsRef<str>>(inputs: &[S]) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    for raw in inputs
        .iter()
        .flat_map(|entry| entry.as_ref().split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
    {
        match Symbol::parse(raw) {
            Ok(symbol) => {
                if seen.insert(symbol.clone()) {
                    symbols.push(symbol);
                }
            }
            Err(error) => warn!(symbol = raw, %error, "ignoring invalid symbol"),
        }
    }
    symbols
}

/// Partitions `symbols` into chunks of `chunk_size` (clamped to at least 1).
pub fn chunk_symbols(symbols: &[Symbol], chunk_size: usize) -> Vec<&[Symbol]> {
    symbols.chunks(chunk_size.max(1)).collect()
}

/// Formats up to [`MISSING_SAMPLE`] symbols, followed by `...` when truncated.
pub fn missing_sample(symbols: &[Symbol]) -> String {
    let mut sample = symbols
        .iter()
        .take(MISSING_SAMPLE)
        .map(Symbol::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if symbols.len() > MISSING_SAMPLE {
        sample.push_str(", ...");
    }
    sample
}

/// An upstream lookup that accepts several symbols per request.
pub trait ChunkSource: Send + Sync {
    fn fetch_chunk<'a>(&'a self, symbols: &'a [Symbol]) -> FetchFuture<'a, Vec<Ticker>>;
}

/// Merged outcome of a chunked fetch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Records in requested order; symbols without data are omitted.
    pub records: Vec<Ticker>,
    /// Requested symbols absent from every chunk response.
    pub missing: Vec<Symbol>,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub last_error: Option<SourceError>,
}

impl BatchOutcome {
    /// Partial data is success. Only a run in which every chunk failed with
    /// a fatal error is reported as an error.
    pub fn into_result(self) -> Result<Vec<Ticker>, SourceError> {
        match self.last_error {
            Some(error)
                if error.is_fatal() && self.records.is_empty() && self.failed_chunks == self.chunks =>
            {
                Err(error)
            }
            _ => Ok(self.records),
        }
    }
}

/// Issues one request per chunk, pausing between chunks.
#[derive(Clone)]
pub struct ChunkedFetcher {
    provider: ProviderId,
    pacer: Arc<dyn Cooldown>,
}

impl ChunkedFetcher {
    pub fn new(provider: ProviderId, pacer: Arc<dyn Cooldown>) -> Self {
        Self { provider, pacer }
    }

    pub async fn run<S>(&self, source: &S, options: &MetadataOptions) -> BatchOutcome
    where
        S: ChunkSource + ?Sized,
    {
        let chunks = chunk_symbols(&options.symbols, options.chunk_size);
        let total = chunks.len();
        let mut merged: HashMap<Symbol, Ticker> = HashMap::with_capacity(options.symbols.len());
        let mut failed_chunks = 0;
        let mut last_error = None;

        for (index, chunk) in chunks.iter().enumerate() {
            debug!(
                provider = %self.provider,
                chunk = index + 1,
                of = total,
                symbols = chunk.len(),
                "requesting metadata chunk"
            );
            match source.fetch_chunk(chunk).await {
                Ok(records) => {
                    for record in records {
                        merged.entry(record.symbol.clone()).or_insert(record);
                    }
                }
                Err(error) => {
                    failed_chunks += 1;
                    warn!(
                        provider = %self.provider,
                        chunk = index + 1,
                        code = error.code(),
                        first = %chunk[0],
                        "metadata chunk failed: {}",
                        error.message()
                    );
                    last_error = Some(error);
                }
            }

            if index + 1 < total {
                self.pacer.pause(options.delay).await;
            }
        }

        let mut records = Vec::with_capacity(merged.len());
        let mut missing = Vec::new();
        for symbol in &options.symbols {
            match merged.remove(symbol) {
                Some(record) => records.push(record),
                None => missing.push(symbol.clone()),
            }
        }

        if !missing.is_empty() {
            warn!(
                provider = %self.provider,
                count = missing.len(),
                "no metadata returned for: {}",
                missing_sample(&missing)
            );
        }
        info!(
            provider = %self.provider,
            requested = options.symbols.len(),
            returned = records.len(),
            chunks = total,
            failed_chunks,
            "metadata fetch finished"
        );

        BatchOutcome {
            records,
            missing,
            chunks: total,
            failed_chunks,
            last_error,
        }
    }
}
