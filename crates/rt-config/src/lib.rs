//! # rt-config
//!
//! Layered settings for the rusty-threads binary: built-in defaults, then an
//! optional TOML file, then `RUSTY_THREADS__*` environment variables
//! (`RUSTY_THREADS__DATABASE__URL=...`). A `.env` file is honoured first.

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default settings file, looked up relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rusty-threads.toml";

const ENV_PREFIX: &str = "RUSTY_THREADS";
const MIN_PEPPER_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection string, e.g. `sqlite://rusty_threads.db`.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Directory uploads are written under.
    pub root: PathBuf,
    /// Public prefix of returned URLs.
    pub url_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// JSON file backing the local key-value cache.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Server-side secret mixed into every password hash.
    #[serde(deserialize_with = "secret_string")]
    pub pepper: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl Settings {
    /// Loads `.env`, then defaults, `rusty-threads.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Like `load`, reading `file` instead of the default settings file and
    /// skipping `.env`.
    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("database.url", "sqlite://rusty_threads.db")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("media.root", "./data/uploads")?
            .set_default("media.url_prefix", "/static/uploads")?
            .set_default("cache.path", "./data/cache.json")?
            .set_default("auth.pepper", "")?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if self.auth.pepper.expose_secret().len() < MIN_PEPPER_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.pepper must be set and at least {MIN_PEPPER_LEN} characters"
            )));
        }
        Ok(())
    }
}
