use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use crate::config::CheckConfig;

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Save,
    /// Overwrite the config file with defaults
    Restore,
}

pub fn run(action: ConfigAction, config: &CheckConfig, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", toml::to_string_pretty(config)?),
        ConfigAction::Save => {
            config.save(path)?;
            println!("Configuration saved to {}", path.display());
        }
        ConfigAction::Restore => {
            CheckConfig::restore(path)?;
            println!("Configuration restored to defaults in {}", path.display());
        }
    }
    Ok(())
}
