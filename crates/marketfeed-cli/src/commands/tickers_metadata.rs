use marketfeed_core::{service, ProviderId, ProviderRegistry, TickersOptions};

use crate::cli::FetchTickersMetadataArgs;
use crate::error::CliError;
use crate::sink::CsvSink;

use super::{create_provider, delay_from_secs};

pub async fn run(
    args: &FetchTickersMetadataArgs,
    registry: &ProviderRegistry,
    sink: &CsvSink,
) -> Result<(), CliError> {
    let delay = delay_from_secs(args.delay)?;
    let provider = create_provider(registry, &args.provider)?;

    let tickers = service::enrich_tickers_with_metadata(
        provider.as_ref(),
        &TickersOptions::new(args.exchange.clone()),
        args.limit,
        args.chunk_size,
        delay,
    )
    .await?;

    sink.write(&file_name(provider.id(), args.exchange.as_deref()), tickers.as_slice())?;
    Ok(())
}

fn file_name(provider: ProviderId, exchange: Option<&str>) -> String {
    format!("{provider}_{}_tickers_metadata.csv", exchange.unwrap_or("all"))
}
