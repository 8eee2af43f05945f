//! Handles settings for the application.
//!
//! Sources, lowest priority first: built-in defaults, an optional
//! `settings.toml` in the working directory, then `SPLITLEDGER__*`
//! environment variables (e.g. `SPLITLEDGER__APP__LEVEL=debug`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

fn default_database() -> Database {
    Database::Sqlite("./splitledger.db".to_string())
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    #[serde(default = "default_database")]
    pub database: Database,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("SPLITLEDGER").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_urls() {
        assert_eq!(Database::Memory.url(), "sqlite::memory:");
        assert_eq!(
            Database::Sqlite("/tmp/ledger.db".to_string()).url(),
            "sqlite:/tmp/ledger.db?mode=rwc"
        );
    }

    #[test]
    fn defaults_apply_without_sources() {
        let settings: Settings = Config::builder()
            .set_default("app.level", "info")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database, default_database());
    }
}
