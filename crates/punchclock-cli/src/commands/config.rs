use clap::Subcommand;
use punchclock_core::{Config, ConfigError};

use super::{CliResult, Output};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "shift.start", "auto_check_in.enabled")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value (JSON for tables such as "auto_check_in.office_location")
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction, out: Output) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            out.emit(&serde_json::json!({ "key": key, "value": value }), || {
                println!("{value}")
            })?;
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            out.emit(&config, || println!("ok"))?;
        }
        ConfigAction::List => {
            let config = Config::load()?;
            out.emit(&config, || {
                for (key, value) in config.entries() {
                    println!("{key} = {value}");
                }
            })?;
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            out.emit(&config, || println!("config reset to defaults"))?;
        }
    }
    Ok(())
}
