//! Persistence of device sightings keyed by composite identity.

pub mod config;
mod memory;
mod sqlite;

pub use config::{StoreConfig, StoreType};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Everything known about a device at the moment it is seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sighting {
    pub composite_id: String,
    pub fp_id: String,
    pub ip: String,
    pub ua: String,
    pub lang: String,
    pub tz: String,
}

/// A stored device row.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct CompositeRecord {
    #[sqlx(rename = "compositeId")]
    pub composite_id: String,
    #[sqlx(rename = "fpId")]
    pub fp_id: String,
    pub ip: String,
    pub ua: String,
    pub lang: String,
    pub tz: String,
    #[sqlx(rename = "lastSeen")]
    pub last_seen: OffsetDateTime,
}

impl CompositeRecord {
    pub fn new(sighting: &Sighting, seen_at: OffsetDateTime) -> Self {
        CompositeRecord {
            composite_id: sighting.composite_id.clone(),
            fp_id: sighting.fp_id.clone(),
            ip: sighting.ip.clone(),
            ua: sighting.ua.clone(),
            lang: sighting.lang.clone(),
            tz: sighting.tz.clone(),
            last_seen: seen_at,
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a record for an unseen composite id, otherwise only moves
    /// `last_seen` forward. Must be a single atomic write.
    async fn upsert(&self, sighting: &Sighting, seen_at: OffsetDateTime) -> Result<(), StoreError>;

    async fn get(&self, composite_id: &str) -> Result<Option<CompositeRecord>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

pub async fn open(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    match &config.r#type {
        StoreType::Sqlite { path } => {
            tracing::info!(path = %path.display(), "opening sqlite device store");
            Ok(Arc::new(SqliteStore::open(path).await?))
        }
        StoreType::Memory => {
            tracing::warn!("using the in-memory device store, records are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
