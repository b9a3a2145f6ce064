use marketfeed_core::{service, ProviderId, ProviderRegistry, TickersOptions};
use tracing::info;

use crate::cli::FetchTickersArgs;
use crate::error::CliError;
use crate::sink::CsvSink;

use super::create_provider;

pub async fn run(
    args: &FetchTickersArgs,
    registry: &ProviderRegistry,
    sink: &CsvSink,
) -> Result<(), CliError> {
    let provider = create_provider(registry, &args.provider)?;

    let mut options = TickersOptions::new(args.exchange.clone());
    if let Some(exclude_type) = &args.exclude_type {
        options = options.with_exclude_type(exclude_type.clone());
    }

    let tickers = service::list_tickers(provider.as_ref(), &options).await?;
    info!(provider = %provider.id(), total = tickers.len(), "fetched tickers");

    sink.write(&file_name(provider.id(), args.exchange.as_deref()), tickers.as_slice())?;
    Ok(())
}

fn file_name(provider: ProviderId, exchange: Option<&str>) -> String {
    format!("{provider}_{}_tickers.csv", exchange.unwrap_or("all"))
}
