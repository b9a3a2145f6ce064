use marketfeed_core::{service, OptionableKind, OptionableOptions, ProviderId, ProviderRegistry};

use crate::cli::FetchOptionableArgs;
use crate::error::CliError;
use crate::sink::CsvSink;

use super::{create_provider, delay_from_secs};

pub async fn run(
    args: &FetchOptionableArgs,
    registry: &ProviderRegistry,
    sink: &CsvSink,
) -> Result<(), CliError> {
    let kind: OptionableKind = args.kind.parse()?;
    let mut options =
        OptionableOptions::new(kind, args.max_tickers)?.with_exchange(args.exchange.clone());
    if let Some(delay) = delay_from_secs(args.delay)? {
        options = options.with_delay(delay);
    }
    let provider = create_provider(registry, &args.provider)?;

    let tickers = service::list_optionable(provider.as_ref(), &options).await?;

    sink.write(&file_name(provider.id(), kind, args.max_tickers), tickers.as_slice())?;
    Ok(())
}

fn file_name(provider: ProviderId, kind: OptionableKind, max: Option<usize>) -> String {
    match max {
        Some(max) => format!("{provider}_{kind}_optionable_tickers_{max}.csv"),
        None => format!("{provider}_{kind}_optionable_tickers.csv"),
    }
}
