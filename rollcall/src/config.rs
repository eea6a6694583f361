//! Configuration management

use rollcall_roster::{DateZone, DEFAULT_MAX_BODY_BYTES};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub attendance: AttendanceConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file, or `:memory:`
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Create missing tables on startup
    #[serde(default)]
    pub init_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            init_schema: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AttendanceConfig {
    /// Calendar used for records submitted without a date
    #[serde(default)]
    pub date_zone: DateZone,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub enable_cors: bool,

    /// Largest attendance batch body accepted, in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enable_cors: false,
            max_body_size: default_max_body_size(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("rollcall.sqlite3")
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

impl Config {
    /// Load configuration from an optional file and `ROLLCALL_*` environment
    /// variables (`ROLLCALL_DATABASE__PATH` sets `database.path`).
    pub fn load(file: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("ROLLCALL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }
}
