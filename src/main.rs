use std::process::ExitCode;

use clap::Parser;
use foodgram_rs::cli::{Cli, execute_command, load_and_merge_config};
use foodgram_rs::logger::init_logger;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (settings, environment) = match load_and_merge_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let logger = settings
        .logger
        .to_logger_config()
        .map_err(anyhow::Error::from)
        .and_then(|config| init_logger(&config).map_err(anyhow::Error::from));
    if let Err(e) = logger {
        eprintln!("Logger initialization error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match execute_command(&cli, settings, environment).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
