use device_store::StoreConfig;
use ingest::config::{Config as IngestConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;

fn default_prefix() -> String {
    "easyfp".into()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_level() -> String {
    "info".into()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
    pub sentry_dsn: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            sentry_dsn: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ingest.validate()?;

        let logging = &self.common.logging;
        tracing_subscriber::EnvFilter::try_new(&logging.level)
            .map_err(|_| ConfigError::InvalidLogLevel(logging.level.clone()))?;
        if let Some(dsn) = &logging.sentry_dsn {
            dsn.parse::<sentry::types::Dsn>()
                .map_err(|_| ConfigError::InvalidSentryDsn)?;
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid ingest config: {0}")]
    Invalid(#[from] ValidationError),
    #[error("invalid log level: {0:?}")]
    InvalidLogLevel(String),
    #[error("invalid sentry dsn")]
    InvalidSentryDsn,
}
