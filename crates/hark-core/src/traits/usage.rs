// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed store for per-user daily usage records.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::HarkError;
use crate::types::{EnsureOutcome, UsageContribution, UsageRecord, UserIdentifier};

/// Persistence seam for the usage ledger.
///
/// Implementations must treat a record whose `expires_at` is at or before
/// `now` as absent, both on read and on conditional create.
#[async_trait]
pub trait UsageStore: Send + Sync + 'static {
    /// Fetch the live record for `(user, date)`, if any.
    async fn get(
        &self,
        user: &UserIdentifier,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>, HarkError>;

    /// Write `record` only if no live record exists under its key.
    async fn create_if_absent(&self, record: &UsageRecord) -> Result<EnsureOutcome, HarkError>;

    /// Atomically add the contribution to its `(user, date)` record, creating
    /// it if absent or expired, and set `expires_at`. Returns the updated record.
    async fn add_minutes(
        &self,
        contribution: &UsageContribution,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<UsageRecord, HarkError>;
}
