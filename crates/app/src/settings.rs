//! Settings for `tally`. Configuration is read from an optional
//! `settings.toml`, then overridden by `TALLY__*` environment variables
//! (e.g. `TALLY__APP__LEVEL=debug`, `TALLY__DATABASE__SQLITE=/tmp/t.db`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    /// Log level for the `tally` and `engine` targets.
    pub level: String,
    /// Deadline for a single batch of transactions.
    pub timeout_secs: u64,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            timeout_secs: 30,
        }
    }
}

/// `database = "memory"` or `[database] sqlite = "path"`.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite(String::from("tally.db"))
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
}

impl Settings {
    /// Load `file` (name without extension, may be absent) and the
    /// environment.
    pub fn new(file: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("TALLY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}
