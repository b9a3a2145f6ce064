use marketfeed_core::{
    normalize_symbols, service, Capability, ProviderId, ProviderRegistry, SourceError, Symbol,
    TickersOptions,
};
use tracing::{info, warn};

use crate::cli::FetchMetadataArgs;
use crate::error::CliError;
use crate::sink::CsvSink;

use super::{create_provider, delay_from_secs};

/// Symbol lists longer than this are summarised by count in the file name.
const NAMED_SYMBOLS_MAX: usize = 3;

pub async fn run(
    args: &FetchMetadataArgs,
    registry: &ProviderRegistry,
    sink: &CsvSink,
) -> Result<(), CliError> {
    let delay = delay_from_secs(args.delay)?;
    let provider = create_provider(registry, &args.provider)?;
    if !provider.capabilities().metadata {
        return Err(SourceError::unsupported_capability(provider.id(), Capability::Metadata).into());
    }

    let requested = normalize_symbols(args.tickers.as_slice());
    if requested.is_empty() && !args.tickers.is_empty() {
        return Err(CliError::Argument(String::from("no valid symbols in --ticker")));
    }
    let (symbols, suffix) = if requested.is_empty() {
        info!(provider = %provider.id(), "no tickers given, using the full ticker list");
        let tickers = service::list_tickers(provider.as_ref(), &TickersOptions::default()).await?;
        let symbols: Vec<Symbol> = tickers.into_iter().map(|ticker| ticker.symbol).collect();
        (symbols, String::from("all"))
    } else {
        let suffix = suffix_for(&requested);
        (requested, suffix)
    };

    if symbols.is_empty() {
        warn!(provider = %provider.id(), "ticker list is empty, no metadata to fetch");
        return Ok(());
    }

    let names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
    let metadata =
        service::fetch_metadata(provider.as_ref(), names.as_slice(), args.chunk_size, delay).await?;

    sink.write(&file_name(provider.id(), &suffix), metadata.as_slice())?;
    Ok(())
}

fn suffix_for(symbols: &[Symbol]) -> String {
    if symbols.len() <= NAMED_SYMBOLS_MAX {
        symbols.iter().map(Symbol::as_str).collect::<Vec<_>>().join("_")
    } else {
        format!("{}_symbols", symbols.len())
    }
}

fn file_name(provider: ProviderId, suffix: &str) -> String {
    format!("{provider}_{suffix}_metadata.csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_symbol_lists_are_named_long_ones_counted() {
        let few = normalize_symbols(&["msft", "AAPL,msft"]);
        assert_eq!(file_name(ProviderId::Yfinance, &suffix_for(&few)), "yfinance_MSFT_AAPL_metadata.csv");

        let many = normalize_symbols(&["A", "B", "C", "D", "E"]);
        assert_eq!(suffix_for(&many), "5_symbols");
    }
}
