// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use hark_config::model::StorageConfig;
use hark_core::{
    AdapterType, EnsureOutcome, HarkError, HealthStatus, PluginAdapter, StorageAdapter,
    TranscriptObject, TranscriptStore, UsageContribution, UsageRecord, UsageStore, UserIdentifier,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store for usage records and transcripts.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. Nothing is opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, HarkError> {
        self.db.get().ok_or_else(|| HarkError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Remove usage rows past their retention window.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, HarkError> {
        let removed = queries::usage::purge_expired(self.db()?, now).await?;
        if removed > 0 {
            debug!(removed, "purged expired usage records");
        }
        Ok(removed)
    }

    /// Number of transcripts archived for a user.
    pub async fn transcript_count(&self, user: &UserIdentifier) -> Result<u64, HarkError> {
        queries::transcripts::count_for_user(self.db()?, &user.0).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HarkError> {
        let db = match self.db() {
            Ok(db) => db,
            Err(_) => return Ok(HealthStatus::Unhealthy("not initialized".into())),
        };
        let probe = db
            .connection()
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await;
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), HarkError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), HarkError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| HarkError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), HarkError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl UsageStore for SqliteStorage {
    async fn get(
        &self,
        user: &UserIdentifier,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>, HarkError> {
        queries::usage::get_usage(self.db()?, user, date, now).await
    }

    async fn create_if_absent(&self, record: &UsageRecord) -> Result<EnsureOutcome, HarkError> {
        queries::usage::create_if_absent(self.db()?, record).await
    }

    async fn add_minutes(
        &self,
        contribution: &UsageContribution,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<UsageRecord, HarkError> {
        queries::usage::add_minutes(self.db()?, contribution, now, expires_at).await
    }
}

#[async_trait]
impl TranscriptStore for SqliteStorage {
    async fn put(&self, object: &TranscriptObject) -> Result<(), HarkError> {
        queries::transcripts::put_transcript(self.db()?, object).await
    }

    async fn get(&self, archive_key: &str) -> Result<Option<String>, HarkError> {
        queries::transcripts::get_transcript(self.db()?, archive_key).await
    }
}
