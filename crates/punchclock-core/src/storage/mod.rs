mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, ConfigSettingsStore, OwnerConfig};
pub use database::{Database, SharedDatabase};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/punchclock/`, or `$PUNCHCLOCK_DATA_DIR` when set.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("PUNCHCLOCK_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("punchclock"),
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
