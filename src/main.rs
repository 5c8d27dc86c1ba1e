//! repsync CLI entry point.

use clap::Parser;

use repsync::cli::{self, Cli};
use repsync::infrastructure::config::ConfigLoader;
use repsync::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => cli::handle_error(&err, json_mode),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => cli::handle_error(&err, json_mode),
    };

    if let Err(err) = cli::run(cli, &config).await {
        tracing::debug!(error = %err, "command failed");
        cli::handle_error(&err, json_mode);
    }
}
