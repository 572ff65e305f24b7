// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the server-side stack (SQLite storage, usage
//! ledger, credential issuer, transcript archive) over a temporary database,
//! and hands out gateway state or a ready router for request-level tests.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use hark_archive::TranscriptArchive;
use hark_config::model::StorageConfig;
use hark_core::constants::DAILY_LIMIT_MINUTES;
use hark_core::{HarkError, PluginAdapter, StorageAdapter, TranscriptStore, UsageStore};
use hark_credential::{CredentialIssuer, Fingerprinter, TokenSigner};
use hark_gateway::{GatewayState, HealthState, build_router};
use hark_storage::SqliteStorage;
use hark_usage::UsageLedger;

/// API key and secret the harness signs tokens with.
pub const TEST_API_KEY: &str = "devkey";
pub const TEST_API_SECRET: &str = "secret";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    daily_limit: u32,
    fingerprint_key: Option<String>,
    usage_store: Option<Arc<dyn UsageStore>>,
    transcript_store: Option<Arc<dyn TranscriptStore>>,
    metrics_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            daily_limit: DAILY_LIMIT_MINUTES,
            fingerprint_key: None,
            usage_store: None,
            transcript_store: None,
            metrics_render: None,
        }
    }

    /// Override the daily allowance.
    pub fn with_daily_limit(mut self, minutes: u32) -> Self {
        self.daily_limit = minutes;
        self
    }

    /// Fingerprint client addresses with a keyed hash.
    pub fn with_fingerprint_key(mut self, key: impl Into<String>) -> Self {
        self.fingerprint_key = Some(key.into());
        self
    }

    /// Put the ledger on a different usage backend (e.g. a failing one).
    pub fn with_usage_store(mut self, store: Arc<dyn UsageStore>) -> Self {
        self.usage_store = Some(store);
        self
    }

    /// Put the archive on a different transcript backend.
    pub fn with_transcript_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.transcript_store = Some(store);
        self
    }

    /// Enable `/metrics` with the given render function.
    pub fn with_metrics(mut self, render: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        self.metrics_render = Some(render);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, HarkError> {
        let temp_dir = tempfile::TempDir::new().map_err(HarkError::storage)?;
        let db_path = temp_dir.path().join("hark-test.db");

        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        storage.initialize().await?;

        let usage_store = self
            .usage_store
            .unwrap_or_else(|| Arc::clone(&storage) as Arc<dyn UsageStore>);
        let transcript_store = self
            .transcript_store
            .unwrap_or_else(|| Arc::clone(&storage) as Arc<dyn TranscriptStore>);

        let ledger = UsageLedger::with_limit(usage_store, self.daily_limit);
        let fingerprinter = match self.fingerprint_key {
            Some(key) => Fingerprinter::keyed(key),
            None => Fingerprinter::unkeyed(),
        };
        let issuer = CredentialIssuer::new(
            ledger.clone(),
            TokenSigner::new(TEST_API_KEY, TEST_API_SECRET),
            fingerprinter,
        );
        let archive = TranscriptArchive::new(transcript_store, ledger.clone());

        Ok(TestHarness {
            storage,
            ledger,
            issuer,
            archive,
            metrics_render: self.metrics_render,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete server-side environment over temp storage.
pub struct TestHarness {
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub ledger: UsageLedger,
    pub issuer: CredentialIssuer,
    pub archive: TranscriptArchive,
    metrics_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with defaults.
    pub async fn new() -> Result<Self, HarkError> {
        Self::builder().build().await
    }

    /// Signer matching the one the issuer uses, for decoding tokens.
    pub fn signer(&self) -> TokenSigner {
        TokenSigner::new(TEST_API_KEY, TEST_API_SECRET)
    }

    pub fn gateway_state(&self) -> GatewayState {
        GatewayState {
            issuer: self.issuer.clone(),
            archive: self.archive.clone(),
            ledger: self.ledger.clone(),
            health: HealthState {
                start_time: Instant::now(),
                prometheus_render: self.metrics_render.clone(),
                storage: Some(Arc::clone(&self.storage) as Arc<dyn PluginAdapter>),
            },
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.gateway_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hark_core::UserIdentifier;

    #[tokio::test]
    async fn harness_shares_one_ledger() {
        let harness = TestHarness::builder().with_daily_limit(5).build().await.unwrap();
        let user = UserIdentifier("u1".into());

        harness.ledger.add_minutes(&user, 3, None, None).await.unwrap();

        let report = harness.issuer.ledger().get_usage(&user).await;
        assert_eq!(report.used_minutes, 3);
        assert_eq!(report.daily_limit, 5);
    }
}
