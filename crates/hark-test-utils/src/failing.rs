// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backends that fail on command, for exercising error paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hark_core::{
    EnsureOutcome, HarkError, TranscriptObject, TranscriptStore, UsageContribution, UsageRecord,
    UsageStore, UserIdentifier,
};

fn injected(operation: &str) -> HarkError {
    HarkError::storage(std::io::Error::other(format!("injected {operation} failure")))
}

/// Wraps a real usage store; reads and writes can be failed independently.
pub struct FailingUsageStore {
    inner: Arc<dyn UsageStore>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    add_calls: AtomicUsize,
}

impl FailingUsageStore {
    pub fn new(inner: Arc<dyn UsageStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            add_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fails both `create_if_absent` and `add_minutes`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `add_minutes` calls, failed or not.
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsageStore for FailingUsageStore {
    async fn get(
        &self,
        user: &UserIdentifier,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>, HarkError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        self.inner.get(user, date, now).await
    }

    async fn create_if_absent(&self, record: &UsageRecord) -> Result<EnsureOutcome, HarkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("create"));
        }
        self.inner.create_if_absent(record).await
    }

    async fn add_minutes(
        &self,
        contribution: &UsageContribution,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<UsageRecord, HarkError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("add"));
        }
        self.inner.add_minutes(contribution, now, expires_at).await
    }
}

/// A transcript store whose writes always fail.
#[derive(Default)]
pub struct FailingTranscriptStore;

#[async_trait]
impl TranscriptStore for FailingTranscriptStore {
    async fn put(&self, _object: &TranscriptObject) -> Result<(), HarkError> {
        Err(injected("put"))
    }

    async fn get(&self, _archive_key: &str) -> Result<Option<String>, HarkError> {
        Ok(None)
    }
}
