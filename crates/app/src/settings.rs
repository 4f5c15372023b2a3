//! Settings for the `petpoints` CLI.
//!
//! Layers, lowest priority first: built-in defaults, the optional TOML file
//! (`config/petpoints.toml` unless `--config` says otherwise), `PETPOINTS_*`
//! environment variables, then command line flags.

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/petpoints.toml";

/// Where the engine keeps its state.
///
/// In TOML either `database = "memory"` or `database = { sqlite = "path" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    /// `memory` selects the in-memory store, anything else is a sqlite path.
    pub fn from_flag(value: &str) -> Self {
        if value.eq_ignore_ascii_case("memory") {
            Database::Memory
        } else {
            Database::Sqlite(value.to_string())
        }
    }

    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub level: String,
    pub database: Database,
    pub timezone: String,
    pub daily_play_limit: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            database: Database::Sqlite("petpoints.db".to_string()),
            timezone: "UTC".to_string(),
            daily_play_limit: engine::DEFAULT_DAILY_PLAY_LIMIT,
        }
    }
}

/// Values given on the command line. They win over every other layer.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<String>,
    pub level: Option<String>,
    pub database: Option<String>,
    pub timezone: Option<String>,
    pub daily_play_limit: Option<u64>,
}

impl Settings {
    pub fn load(overrides: Overrides) -> Result<Self> {
        let config_path = overrides.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::File::with_name(config_path).required(false));
        builder = builder.add_source(
            config::Environment::with_prefix("PETPOINTS")
                .separator("__")
                .try_parsing(true),
        );
        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Some(level) = overrides.level {
            settings.level = level;
        }
        if let Some(database) = overrides.database {
            settings.database = Database::from_flag(&database);
        }
        if let Some(timezone) = overrides.timezone {
            settings.timezone = timezone;
        }
        if let Some(limit) = overrides.daily_play_limit {
            settings.daily_play_limit = limit;
        }

        Ok(settings)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| AppError::Timezone(format!("{}: {err}", self.timezone)))
    }
}
