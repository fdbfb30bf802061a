use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://www2.seattle.gov/ethics";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub db_path: PathBuf,
    pub workers: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub chunk_size: usize,
}

impl Settings {
    /// Defaults, then `seec.toml` if present, then `SEEC_*` variables
    /// (`SEEC_WORKERS=8`, `SEEC_DB_PATH=...`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("seec").required(false))
                .add_source(Environment::with_prefix("SEEC")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("db_path", "data/seec.db")?
            .set_default("workers", 4_i64)?
            .set_default("timeout_secs", 30_i64)?
            .set_default("user_agent", concat!("seec_scraper/", env!("CARGO_PKG_VERSION")))?
            .set_default("chunk_size", 200_i64)?
            .build()?
            .try_deserialize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
