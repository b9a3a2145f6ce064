//! CLI argument definitions for marketfeed.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch-tickers` | List tradable symbols |
//! | `fetch-candles` | Fetch OHLCV bars for one symbol |
//! | `fetch-metadata` | Fetch ticker metadata for given symbols |
//! | `fetch-tickers-metadata` | List tickers and enrich them with metadata |
//! | `fetch-optionable-tickers` | List symbols with listed options |
//! | `providers` | Show registered providers and their capabilities |
//!
//! # Examples
//!
//! ```bash
//! marketfeed fetch-tickers --provider polygon
//! marketfeed fetch-candles --provider alpha_vantage --ticker IBM --from-date 2024-01-02
//! marketfeed fetch-metadata --provider yfinance --ticker AAPL --ticker MSFT --chunk-size 50
//! marketfeed fetch-optionable-tickers --provider cboe --type weeklies --max-tickers 100
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Fetch tickers, candles and metadata from market-data providers into CSV files.
#[derive(Debug, Parser)]
#[command(name = "marketfeed", author, version, about)]
pub struct Cli {
    /// Directory the CSV files are written to.
    #[arg(long, global = true, default_value = "csv")]
    pub output_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List tradable symbols.
    ///
    ///   marketfeed fetch-tickers --provider yfinance --exchange nasdaq
    FetchTickers(FetchTickersArgs),

    /// Fetch OHLCV bars for one symbol.
    ///
    ///   marketfeed fetch-candles --provider polygon --ticker AAPL --from-date 2024-01-02 --timespan minute --multiplier 5
    FetchCandles(FetchCandlesArgs),

    /// Fetch metadata for symbols; without --ticker, for the provider's full ticker list.
    FetchMetadata(FetchMetadataArgs),

    /// List tickers and overlay the metadata fetched for them.
    FetchTickersMetadata(FetchTickersMetadataArgs),

    /// List symbols with listed options.
    FetchOptionableTickers(FetchOptionableArgs),

    /// Show registered providers, tiers, credentials and capabilities.
    Providers,
}

#[derive(Debug, Args)]
pub struct ProviderArg {
    /// Provider name: yfinance, polygon, alpha_vantage, sec or cboe.
    #[arg(long)]
    pub provider: String,
}

#[derive(Debug, Args)]
pub struct FetchTickersArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Exchange filter (e.g. XNAS for polygon, nasdaq or other for yfinance).
    #[arg(long)]
    pub exchange: Option<String>,

    /// Asset type to leave out of the listing (polygon).
    #[arg(long)]
    pub exclude_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct FetchCandlesArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    #[arg(long)]
    pub ticker: String,

    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub from_date: String,

    /// Last day, YYYY-MM-DD. Defaults to today (UTC).
    #[arg(long)]
    pub to_date: Option<String>,

    /// minute, hour, day, week or month.
    #[arg(long, default_value = "day")]
    pub timespan: String,

    #[arg(long, default_value_t = 1)]
    pub multiplier: u32,
}

#[derive(Debug, Args)]
pub struct FetchMetadataArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Symbol to look up; repeat or comma-separate for several.
    #[arg(long = "ticker")]
    pub tickers: Vec<String>,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Seconds to wait between chunks.
    #[arg(long)]
    pub delay: Option<f64>,
}

#[derive(Debug, Args)]
pub struct FetchTickersMetadataArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    #[arg(long)]
    pub exchange: Option<String>,

    /// Enrich only the first N tickers.
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Seconds to wait between chunks.
    #[arg(long)]
    pub delay: Option<f64>,
}

#[derive(Debug, Args)]
pub struct FetchOptionableArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// all, weeklies or quarterlies.
    #[arg(long = "type", default_value = "all")]
    pub kind: String,

    #[arg(long)]
    pub exchange: Option<String>,

    #[arg(long)]
    pub max_tickers: Option<usize>,

    /// Seconds to wait between per-symbol probes.
    #[arg(long)]
    pub delay: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_defaults_to_csv() {
        let cli = Cli::try_parse_from(["marketfeed", "providers"]).expect("parses");
        assert_eq!(cli.output_dir, PathBuf::from("csv"));
        assert!(matches!(cli.command, Command::Providers));
    }

    #[test]
    fn candle_defaults_are_one_day() {
        let cli = Cli::try_parse_from([
            "marketfeed",
            "fetch-candles",
            "--provider",
            "polygon",
            "--ticker",
            "AAPL",
            "--from-date",
            "2024-01-02",
        ])
        .expect("parses");

        let Command::FetchCandles(args) = cli.command else {
            panic!("expected fetch-candles");
        };
        assert_eq!(args.provider.provider, "polygon");
        assert_eq!(args.timespan, "day");
        assert_eq!(args.multiplier, 1);
        assert!(args.to_date.is_none());
    }

    #[test]
    fn metadata_tickers_repeat_and_output_dir_is_global() {
        let cli = Cli::try_parse_from([
            "marketfeed",
            "fetch-metadata",
            "--provider",
            "yfinance",
            "--ticker",
            "AAPL",
            "--ticker",
            "MSFT,NA",
            "--output-dir",
            "out",
        ])
        .expect("parses");

        assert_eq!(cli.output_dir, PathBuf::from("out"));
        let Command::FetchMetadata(args) = cli.command else {
            panic!("expected fetch-metadata");
        };
        assert_eq!(args.tickers, vec!["AAPL", "MSFT,NA"]);
    }

    #[test]
    fn optionable_type_flag_defaults_to_all() {
        let cli = Cli::try_parse_from([
            "marketfeed",
            "fetch-optionable-tickers",
            "--provider",
            "cboe",
            "--max-tickers",
            "10",
        ])
        .expect("parses");

        let Command::FetchOptionableTickers(args) = cli.command else {
            panic!("expected fetch-optionable-tickers");
        };
        assert_eq!(args.kind, "all");
        assert_eq!(args.max_tickers, Some(10));
    }
}
