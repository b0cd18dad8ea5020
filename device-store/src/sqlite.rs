use crate::{CompositeRecord, RecordStore, Sighting, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;

// Quoted camelCase column names follow the DeviceFingerprint Prisma model.
// `lastSeen` uses sqlx's `time` text encoding, not Prisma's DateTime format.
const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "DeviceFingerprint" (
    "compositeId" TEXT NOT NULL PRIMARY KEY,
    "fpId" TEXT NOT NULL,
    "ip" TEXT NOT NULL,
    "ua" TEXT NOT NULL,
    "lang" TEXT NOT NULL,
    "tz" TEXT NOT NULL,
    "lastSeen" TEXT NOT NULL
)
"#;

const UPSERT: &str = r#"
INSERT INTO "DeviceFingerprint" ("compositeId", "fpId", "ip", "ua", "lang", "tz", "lastSeen")
VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT ("compositeId") DO UPDATE SET "lastSeen" = excluded."lastSeen"
"#;

const SELECT_ONE: &str = r#"
SELECT "compositeId", "fpId", "ip", "ua", "lang", "tz", "lastSeen"
FROM "DeviceFingerprint"
WHERE "compositeId" = ?
"#;

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn upsert(&self, sighting: &Sighting, seen_at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(UPSERT)
            .bind(&sighting.composite_id)
            .bind(&sighting.fp_id)
            .bind(&sighting.ip)
            .bind(&sighting.ua)
            .bind(&sighting.lang)
            .bind(&sighting.tz)
            .bind(seen_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, composite_id: &str) -> Result<Option<CompositeRecord>, StoreError> {
        let record = sqlx::query_as::<_, CompositeRecord>(SELECT_ONE)
            .bind(composite_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
