mod candles;
mod metadata;
mod optionable;
mod providers;
mod tickers;
mod tickers_metadata;

use std::sync::Arc;
use std::time::Duration;

use marketfeed_core::{Provider, ProviderRegistry};
use tracing::info;

use crate::cli::{Cli, Command, ProviderArg};
use crate::error::CliError;
use crate::sink::CsvSink;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let registry = ProviderRegistry::new();
    let sink = CsvSink::new(&cli.output_dir);

    match &cli.command {
        Command::FetchTickers(args) => tickers::run(args, &registry, &sink).await,
        Command::FetchCandles(args) => candles::run(args, &registry, &sink).await,
        Command::FetchMetadata(args) => metadata::run(args, &registry, &sink).await,
        Command::FetchTickersMetadata(args) => tickers_metadata::run(args, &registry, &sink).await,
        Command::FetchOptionableTickers(args) => optionable::run(args, &registry, &sink).await,
        Command::Providers => {
            providers::run(&registry);
            Ok(())
        }
    }
}

fn create_provider(
    registry: &ProviderRegistry,
    arg: &ProviderArg,
) -> Result<Arc<dyn Provider>, CliError> {
    let provider = registry.create(&arg.provider)?;
    info!(provider = %provider.id(), "provider ready");
    Ok(provider)
}

/// Converts a `--delay` value in seconds.
fn delay_from_secs(secs: Option<f64>) -> Result<Option<Duration>, CliError> {
    secs.map(|value| {
        Duration::try_from_secs_f64(value)
            .map_err(|_| CliError::Argument(format!("--delay must be a non-negative number of seconds, got {value}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_accepts_fractions_and_rejects_negatives() {
        assert_eq!(delay_from_secs(None).expect("absent"), None);
        assert_eq!(
            delay_from_secs(Some(1.5)).expect("valid"),
            Some(Duration::from_millis(1500))
        );

        let error = delay_from_secs(Some(-1.0)).expect_err("negative");
        assert_eq!(error.exit_code(), 2);
        assert!(delay_from_secs(Some(f64::NAN)).is_err());
    }
}
