use fingerprint::{ContextOptions, DigestBackend, IdentityPolicy};
use hyper::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidHeaderValue { field: &'static str, value: String },

    #[error("At least one client address header is required")]
    NoClientAddressHeaders,

    #[error("max_body_bytes must be greater than 0")]
    InvalidMaxBodyBytes,
}

fn default_max_body_bytes() -> usize {
    16 * 1024
}

/// Ingest service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for beacons
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    #[serde(default)]
    pub identity: IdentityConfig,
    /// How client address, platform fingerprint and header order are read
    #[serde(default)]
    pub client: ContextOptions,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Beacon bodies larger than this are rejected
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.client.client_address_headers.is_empty() {
            return Err(ValidationError::NoClientAddressHeaders);
        }
        for name in self
            .client
            .client_address_headers
            .iter()
            .chain(self.client.platform_fingerprint_header.as_ref())
        {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ValidationError::InvalidHeaderName(name.clone()))?;
        }

        self.cors.validate()?;

        if self.max_body_bytes == 0 {
            return Err(ValidationError::InvalidMaxBodyBytes);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct IdentityConfig {
    #[serde(default)]
    pub policy: IdentityPolicy,
    #[serde(default)]
    pub digest: DigestBackend,
}

fn default_allow_origin() -> String {
    "*".into()
}

fn default_allow_headers() -> String {
    "Content-Type, CF-Connecting-IP, x-real-ip".into()
}

fn default_max_age_secs() -> u64 {
    86400
}

/// Headers sent in reply to a CORS pre-flight
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
    #[serde(default = "default_allow_headers")]
    pub allow_headers: String,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        CorsConfig {
            allow_origin: default_allow_origin(),
            allow_headers: default_allow_headers(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl CorsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("cors.allow_origin", &self.allow_origin),
            ("cors.allow_headers", &self.allow_headers),
        ] {
            HeaderValue::from_str(value).map_err(|_| ValidationError::InvalidHeaderValue {
                field,
                value: value.clone(),
            })?;
        }
        Ok(())
    }
}
