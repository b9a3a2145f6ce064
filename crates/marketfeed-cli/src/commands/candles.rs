use marketfeed_core::{
    format_date, parse_date, service, today_utc, BarInterval, CandlesOptions, ProviderId,
    ProviderRegistry, Symbol, Timespan,
};
use tracing::info;

use crate::cli::FetchCandlesArgs;
use crate::error::CliError;
use crate::sink::CsvSink;

use super::create_provider;

pub async fn run(
    args: &FetchCandlesArgs,
    registry: &ProviderRegistry,
    sink: &CsvSink,
) -> Result<(), CliError> {
    let options = parse_options(args)?;
    let provider = create_provider(registry, &args.provider)?;

    let candles = service::list_candles(provider.as_ref(), &options).await?;
    info!(
        provider = %provider.id(),
        symbol = %options.symbol,
        total = candles.len(),
        "fetched candles"
    );

    sink.write(&file_name(provider.id(), &options), candles.as_slice())?;
    Ok(())
}

fn parse_options(args: &FetchCandlesArgs) -> Result<CandlesOptions, CliError> {
    let symbol = Symbol::parse(&args.ticker)?;
    let from = parse_date(&args.from_date)?;
    let to = match &args.to_date {
        Some(value) => parse_date(value)?,
        None => today_utc(),
    };
    let timespan: Timespan = args.timespan.parse()?;
    let interval = BarInterval::new(args.multiplier, timespan)?;

    Ok(CandlesOptions::new(symbol, from, to, interval)?)
}

fn file_name(provider: ProviderId, options: &CandlesOptions) -> String {
    format!(
        "{provider}_{}_candles_{}_to_{}.csv",
        options.symbol,
        format_date(options.from),
        format_date(options.to)
    )
}
