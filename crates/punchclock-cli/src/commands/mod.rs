pub mod attendance;
pub mod auto_check_in;
pub mod config;
pub mod task;

use std::sync::Arc;

use punchclock_core::clock::{Clock, SystemClock};
use punchclock_core::storage::SharedDatabase;
use punchclock_core::{Config, Database};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Output mode chosen by the global `--json` flag.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Print `value` as JSON in `--json` mode, otherwise run `text`.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> CliResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text();
        }
        Ok(())
    }
}

/// Everything a command needs from local storage.
pub struct Env {
    pub config: Config,
    pub db: SharedDatabase,
    pub clock: Arc<dyn Clock>,
}

impl Env {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        config.validate()?;
        let db = Database::open()?.into_shared();
        tracing::debug!(owner = %config.owner.id, "local storage opened");
        Ok(Self {
            config,
            db,
            clock: Arc::new(SystemClock),
        })
    }
}
