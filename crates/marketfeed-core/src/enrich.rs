//! Symbol-keyed join of a base ticker list with fetched metadata.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::batch::missing_sample;
use crate::{ProviderId, Symbol, Ticker};

/// Joined tickers plus the base symbols that had no metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub tickers: Vec<Ticker>,
    pub unmatched: Vec<Symbol>,
}

/// De-duplicates `base` by symbol and keeps the first `limit` entries.
///
/// Applied before the metadata fetch so no request is spent on symbols
/// that would be cut afterwards.
pub fn select_base(base: Vec<Ticker>, limit: Option<usize>) -> Vec<Ticker> {
    let mut seen = HashSet::with_capacity(base.len());
    let mut selected: Vec<Ticker> = Vec::with_capacity(limit.unwrap_or(base.len()).min(base.len()));
    for ticker in base {
        if limit.is_some_and(|max| selected.len() >= max) {
            break;
        }
        if seen.insert(ticker.symbol.clone()) {
            selected.push(ticker);
        }
    }
    selected
}

/// Overlays every populated metadata field onto the matching base record.
///
/// Output follows base order. Base records without a metadata match are
/// emitted unchanged and reported once, as a capped sample.
pub fn enrich(provider: ProviderId, base: Vec<Ticker>, metadata: Vec<Ticker>) -> Enrichment {
    let mut by_symbol: HashMap<Symbol, Ticker> = HashMap::with_capacity(metadata.len());
    for record in metadata {
        by_symbol.entry(record.symbol.clone()).or_insert(record);
    }

    let base = select_base(base, None);
    let mut unmatched = Vec::new();
    let tickers: Vec<Ticker> = base
        .into_iter()
        .map(|mut ticker| {
            match by_symbol.get(&ticker.symbol) {
                Some(extra) => ticker.overlay(extra),
                None => unmatched.push(ticker.symbol.clone()),
            }
            ticker
        })
        .collect();

    if !unmatched.is_empty() {
        warn!(
            provider = %provider,
            count = unmatched.len(),
            "no metadata for {} of {} symbols: {}",
            unmatched.len(),
            tickers.len(),
            missing_sample(&unmatched)
        );
    }
    info!(
        provider = %provider,
        enriched = tickers.len() - unmatched.len(),
        total = tickers.len(),
        "enrichment join finished"
    );

    Enrichment { tickers, unmatched }
}
