mod cli;
mod commands;
mod error;
mod logging;
mod sink;

use clap::Parser;
use std::process::ExitCode;

use crate::cli::Cli;
use crate::error::CliError;
use crate::logging::LogConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Credentials may live in a local .env file; a missing file is fine.
    dotenvy::dotenv().ok();

    if let Err(error) = LogConfig::from_env().init() {
        eprintln!("warning: logging disabled: {error}");
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(code = error.exit_code(), "{error}");
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    commands::run(&cli).await
}
