// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the ledger, issuer, archive, and gateway.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

use crate::error::HarkError;

/// Pseudonymous per-client identifier (truncated hash of the client address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentifier(pub String);

impl fmt::Display for UserIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Random, unguessable identifier correlating a credential, a transcript,
/// and a usage contribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionIdentifier(pub String);

impl fmt::Display for SessionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Observability,
}

/// One user's usage counter for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_identifier: UserIdentifier,
    pub usage_date: NaiveDate,
    pub used_minutes: u32,
    pub last_session_identifier: Option<SessionIdentifier>,
    pub last_room_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Storage key: `{userIdentifier}#{YYYY-MM-DD}`.
    pub fn usage_key(&self) -> String {
        usage_key(&self.user_identifier, self.usage_date)
    }

    /// Whether the retention window has elapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Build the per-user-per-day storage key.
pub fn usage_key(user: &UserIdentifier, date: NaiveDate) -> String {
    format!("{}#{}", user.0, date.format("%Y-%m-%d"))
}

/// Minutes reported for one session, to be added to a day's total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageContribution {
    pub user_identifier: UserIdentifier,
    pub usage_date: NaiveDate,
    pub minutes: u32,
    pub session_identifier: Option<SessionIdentifier>,
    pub room_name: Option<String>,
}

/// Result of a conditional create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// No live record existed; a zeroed one was written.
    Created,
    /// A live record already existed and was left untouched.
    AlreadyExists,
}

/// Outcome of a write whose failure must never fail the surrounding operation.
///
/// Failures are logged when the value is built and then carried as data, so
/// callers can see that bookkeeping was dropped without being able to `?` it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort<T> {
    Done(T),
    Dropped { reason: String },
}

impl<T> BestEffort<T> {
    /// Convert a fallible write into a best-effort outcome, logging any failure.
    pub fn from_result(result: Result<T, HarkError>, operation: &str) -> Self {
        match result {
            Ok(value) => BestEffort::Done(value),
            Err(e) => {
                warn!(operation, error = %e, "best-effort write dropped");
                BestEffort::Dropped {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, BestEffort::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            BestEffort::Done(value) => Some(value),
            BestEffort::Dropped { .. } => None,
        }
    }
}

/// A transcript document ready to be written by a [`TranscriptStore`](crate::TranscriptStore).
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptObject {
    pub archive_key: String,
    pub user_identifier: UserIdentifier,
    pub room_name: String,
    pub session_identifier: SessionIdentifier,
    /// "1.0" for legacy flat strings, "2.0" for structured sessions.
    pub format_version: String,
    pub duration_seconds: f64,
    pub message_count: u64,
    /// Serialized JSON document.
    pub body: String,
    pub stored_at: DateTime<Utc>,
}
