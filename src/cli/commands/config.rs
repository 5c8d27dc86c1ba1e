//! `repsync config`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::ConfigCommands;
use crate::domain::models::Config;

/// Effective configuration, printed by `config show`.
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    /// Merged configuration.
    #[serde(flatten)]
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }
}

/// Run a `config` subcommand.
pub fn execute(command: &ConfigCommands, config: &Config, json_mode: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            output(
                &ConfigOutput {
                    config: config.clone(),
                },
                json_mode,
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_output_yaml_and_json() {
        let out = ConfigOutput {
            config: Config::default(),
        };
        assert!(out.to_human().contains("default_order_field: createdAt"));
        assert_eq!(out.to_json()["cache"]["get_timeout_ms"], 0);
    }
}
