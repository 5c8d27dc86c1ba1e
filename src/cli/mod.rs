//! Command-line interface for `repsync`.

/// Command implementations.
pub mod commands;
/// Human and JSON rendering.
pub mod output;
/// Clap argument types.
pub mod types;

pub use types::{Cli, Commands, ConfigCommands};

use crate::domain::models::Config;

/// Run the parsed command against an already loaded configuration.
pub async fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::GetCollection(args) => commands::collection::execute(args, config, cli.json).await,
        Commands::GetDocument(args) => commands::document::execute(args, config, cli.json).await,
        Commands::Stats(args) => commands::stats::execute(args, config, cli.json).await,
        Commands::Config(command) => commands::config::execute(&command, config, cli.json),
    }
}

/// Print `err` in the requested format and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
