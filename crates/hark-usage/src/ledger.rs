// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily usage ledger with quota enforcement.
//!
//! The ledger owns the quota policy and delegates persistence to a
//! [`UsageStore`]. Reads fail open; the accounting write (`add_minutes`)
//! propagates failures; `ensure_record` reports losing a create race as
//! success.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hark_core::constants::DAILY_LIMIT_MINUTES;
use hark_core::{
    EnsureOutcome, HarkError, SessionIdentifier, UsageContribution, UsageRecord, UsageStore,
    UserIdentifier,
};
use tracing::{debug, info, warn};

use crate::quota;

/// Snapshot of a user's standing against the daily limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReport {
    pub user_identifier: UserIdentifier,
    pub used_minutes: u32,
    /// `used_minutes < daily_limit`.
    pub allowed: bool,
    pub reset_time: DateTime<Utc>,
    pub daily_limit: u32,
}

impl UsageReport {
    /// Minutes left today, saturating at zero.
    pub fn remaining_minutes(&self) -> u32 {
        self.daily_limit.saturating_sub(self.used_minutes)
    }
}

/// Quota policy over a per-user, per-day usage store.
#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
    daily_limit: u32,
}

impl UsageLedger {
    /// Ledger enforcing the product's daily limit.
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self::with_limit(store, DAILY_LIMIT_MINUTES)
    }

    /// Ledger enforcing a custom daily limit.
    pub fn with_limit(store: Arc<dyn UsageStore>, daily_limit: u32) -> Self {
        Self { store, daily_limit }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Create today's record with zero minutes unless one already exists.
    pub async fn ensure_record(
        &self,
        user: &UserIdentifier,
        session: &SessionIdentifier,
        room_name: &str,
    ) -> Result<EnsureOutcome, HarkError> {
        self.ensure_record_at(user, session, room_name, Utc::now()).await
    }

    pub async fn ensure_record_at(
        &self,
        user: &UserIdentifier,
        session: &SessionIdentifier,
        room_name: &str,
        now: DateTime<Utc>,
    ) -> Result<EnsureOutcome, HarkError> {
        let record = UsageRecord {
            user_identifier: user.clone(),
            usage_date: quota::usage_date(now),
            used_minutes: 0,
            last_session_identifier: Some(session.clone()),
            last_room_name: Some(room_name.to_string()),
            created_at: now,
            updated_at: now,
            expires_at: quota::retention_expiry(now),
        };
        let outcome = self.store.create_if_absent(&record).await?;
        debug!(user = %user, ?outcome, "usage record ensured");
        Ok(outcome)
    }

    /// Today's usage for `user`. Never fails: a store error reports zero
    /// usage and `allowed = true`.
    pub async fn get_usage(&self, user: &UserIdentifier) -> UsageReport {
        self.get_usage_at(user, Utc::now()).await
    }

    pub async fn get_usage_at(&self, user: &UserIdentifier, now: DateTime<Utc>) -> UsageReport {
        let used_minutes = match self.store.get(user, quota::usage_date(now), now).await {
            Ok(record) => record.map(|r| r.used_minutes).unwrap_or(0),
            Err(e) => {
                warn!(user = %user, error = %e, "usage read failed, allowing request");
                0
            }
        };

        let allowed = used_minutes < self.daily_limit;
        if allowed && u64::from(used_minutes) * 5 >= u64::from(self.daily_limit) * 4 {
            warn!(
                user = %user,
                used_minutes,
                daily_limit = self.daily_limit,
                "approaching daily usage limit (80%+)"
            );
        }

        UsageReport {
            user_identifier: user.clone(),
            used_minutes,
            allowed,
            reset_time: quota::next_reset(now),
            daily_limit: self.daily_limit,
        }
    }

    /// Add `minutes` to today's counter. Store failures propagate.
    pub async fn add_minutes(
        &self,
        user: &UserIdentifier,
        minutes: u32,
        session: Option<&SessionIdentifier>,
        room_name: Option<&str>,
    ) -> Result<UsageRecord, HarkError> {
        self.add_minutes_at(user, minutes, session, room_name, Utc::now())
            .await
    }

    pub async fn add_minutes_at(
        &self,
        user: &UserIdentifier,
        minutes: u32,
        session: Option<&SessionIdentifier>,
        room_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord, HarkError> {
        let contribution = UsageContribution {
            user_identifier: user.clone(),
            usage_date: quota::usage_date(now),
            minutes,
            session_identifier: session.cloned(),
            room_name: room_name.map(str::to_string),
        };
        let record = self
            .store
            .add_minutes(&contribution, now, quota::retention_expiry(now))
            .await?;
        info!(
            user = %user,
            added = minutes,
            used_minutes = record.used_minutes,
            "usage minutes recorded"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use hark_config::model::StorageConfig;
    use hark_core::StorageAdapter;
    use hark_storage::SqliteStorage;

    struct BrokenStore;

    #[async_trait]
    impl UsageStore for BrokenStore {
        async fn get(
            &self,
            _: &UserIdentifier,
            _: NaiveDate,
            _: DateTime<Utc>,
        ) -> Result<Option<UsageRecord>, HarkError> {
            Err(HarkError::storage("connection reset"))
        }

        async fn create_if_absent(&self, _: &UsageRecord) -> Result<EnsureOutcome, HarkError> {
            Err(HarkError::storage("connection reset"))
        }

        async fn add_minutes(
            &self,
            _: &UsageContribution,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
        ) -> Result<UsageRecord, HarkError> {
            Err(HarkError::storage("connection reset"))
        }
    }

    async fn sqlite_ledger(limit: u32) -> (tempfile::TempDir, UsageLedger) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("ledger.db").to_string_lossy().into_owned(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        (dir, UsageLedger::with_limit(Arc::new(storage), limit))
    }

    fn user() -> UserIdentifier {
        UserIdentifier("a1b2c3d4e5f60718293a4b5c6d7e8f90".into())
    }

    fn session(id: &str) -> SessionIdentifier {
        SessionIdentifier(id.into())
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn missing_record_reports_zero_and_allowed() {
        let (_dir, ledger) = sqlite_ledger(100).await;
        let report = ledger.get_usage_at(&user(), at(1, 9)).await;
        assert_eq!(report.used_minutes, 0);
        assert!(report.allowed);
        assert_eq!(report.remaining_minutes(), 100);
        assert_eq!(report.reset_time, at(2, 0));
    }

    #[tokio::test]
    async fn read_failure_fails_open() {
        let ledger = UsageLedger::with_limit(Arc::new(BrokenStore), 100);
        let report = ledger.get_usage_at(&user(), at(1, 9)).await;
        assert_eq!(report.used_minutes, 0);
        assert!(report.allowed);
        assert_eq!(report.reset_time, at(2, 0));
    }

    #[tokio::test]
    async fn add_failure_propagates() {
        let ledger = UsageLedger::with_limit(Arc::new(BrokenStore), 100);
        let err = ledger
            .add_minutes_at(&user(), 5, None, None, at(1, 9))
            .await
            .unwrap_err();
        assert!(matches!(err, HarkError::Storage { .. }));
    }

    #[tokio::test]
    async fn ensure_record_is_idempotent() {
        let (_dir, ledger) = sqlite_ledger(100).await;
        let first = ledger
            .ensure_record_at(&user(), &session("s1"), "room", at(1, 8))
            .await
            .unwrap();
        ledger
            .add_minutes_at(&user(), 12, Some(&session("s1")), Some("room"), at(1, 9))
            .await
            .unwrap();
        let second = ledger
            .ensure_record_at(&user(), &session("s2"), "room", at(1, 10))
            .await
            .unwrap();

        assert_eq!(first, EnsureOutcome::Created);
        assert_eq!(second, EnsureOutcome::AlreadyExists);
        assert_eq!(ledger.get_usage_at(&user(), at(1, 10)).await.used_minutes, 12);
    }

    #[tokio::test]
    async fn huge_reports_keep_the_quota_closed() {
        let (_dir, ledger) = sqlite_ledger(100).await;
        let huge = crate::quota::minutes_from_seconds(1e15);
        ledger
            .add_minutes_at(&user(), huge, None, None, at(1, 9))
            .await
            .unwrap();
        let record = ledger
            .add_minutes_at(&user(), 1, None, None, at(1, 10))
            .await
            .unwrap();
        assert_eq!(record.used_minutes, u32::MAX);

        let report = ledger.get_usage_at(&user(), at(1, 11)).await;
        assert_eq!(report.used_minutes, u32::MAX);
        assert!(!report.allowed);
        assert_eq!(report.remaining_minutes(), 0);
    }

    #[tokio::test]
    async fn concurrent_ensure_yields_one_record() {
        let (_dir, ledger) = sqlite_ledger(100).await;
        let mut handles = Vec::new();
        for i in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .ensure_record_at(&user(), &session(&format!("s{i}")), "room", at(1, 8))
                    .await
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == EnsureOutcome::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(ledger.get_usage_at(&user(), at(1, 9)).await.used_minutes, 0);
    }

    #[tokio::test]
    async fn limit_reached_disallows_until_next_day() {
        let (_dir, ledger) = sqlite_ledger(100).await;
        ledger
            .add_minutes_at(&user(), 95, None, None, at(1, 8))
            .await
            .unwrap();
        let report = ledger.get_usage_at(&user(), at(1, 9)).await;
        assert!(report.allowed);
        assert_eq!(report.remaining_minutes(), 5);

        ledger
            .add_minutes_at(&user(), 10, None, None, at(1, 10))
            .await
            .unwrap();
        let report = ledger.get_usage_at(&user(), at(1, 11)).await;
        assert_eq!(report.used_minutes, 105);
        assert!(!report.allowed);
        assert_eq!(report.remaining_minutes(), 0);

        let tomorrow = ledger.get_usage_at(&user(), at(2, 1)).await;
        assert_eq!(tomorrow.used_minutes, 0);
        assert!(tomorrow.allowed);
    }
}
