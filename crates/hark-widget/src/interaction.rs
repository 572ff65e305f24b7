// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted notification and interaction history.
//!
//! The record is stored as one JSON document under a fixed key. A stored
//! document is laid over a fresh record, so older or partial documents load
//! with defaults for whatever they lack. Storage failures are logged and
//! never surface to the caller.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use hark_core::HarkError;
use hark_core::constants::INTERACTION_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// What the visitor has seen and done. Timestamps are epoch milliseconds;
/// 0 means never.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    #[serde(with = "chrono::serde::ts_milliseconds", rename = "lastNotificationShown")]
    pub last_notification_shown_at: DateTime<Utc>,
    pub notification_count: u32,
    pub user_declined: bool,
    pub user_accepted: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub session_start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds", rename = "lastInteraction")]
    pub last_interaction_at: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            last_notification_shown_at: DateTime::<Utc>::UNIX_EPOCH,
            notification_count: 0,
            user_declined: false,
            user_accepted: false,
            session_start: now,
            last_interaction_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// String key-value persistence, the shape of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, HarkError>;
    fn set(&self, key: &str, value: &str) -> Result<(), HarkError>;
    fn remove(&self, key: &str) -> Result<(), HarkError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, HarkError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HarkError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HarkError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One `{key}.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, HarkError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HarkError::storage(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HarkError> {
        std::fs::create_dir_all(&self.dir).map_err(HarkError::storage)?;
        std::fs::write(self.path(key), value).map_err(HarkError::storage)
    }

    fn remove(&self, key: &str) -> Result<(), HarkError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HarkError::storage(e)),
        }
    }
}

/// Reads and updates the [`InteractionRecord`].
#[derive(Clone)]
pub struct InteractionStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl InteractionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            key: INTERACTION_STORAGE_KEY.to_string(),
        }
    }

    /// The stored record, or a fresh one if absent or unreadable.
    pub fn load(&self, now: DateTime<Utc>) -> InteractionRecord {
        let fresh = InteractionRecord::fresh(now);
        let stored = match self.backend.get(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return fresh,
            Err(e) => {
                warn!(error = %e, "failed to read interaction record");
                return fresh;
            }
        };
        match merge_over(&fresh, &stored) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "discarding unreadable interaction record");
                fresh
            }
        }
    }

    fn save(&self, record: &InteractionRecord) {
        let result = serde_json::to_string(record)
            .map_err(HarkError::storage)
            .and_then(|text| self.backend.set(&self.key, &text));
        if let Err(e) = result {
            warn!(error = %e, "failed to save interaction record");
        }
    }

    fn update(
        &self,
        now: DateTime<Utc>,
        change: impl FnOnce(&mut InteractionRecord),
    ) -> InteractionRecord {
        let mut record = self.load(now);
        change(&mut record);
        self.save(&record);
        record
    }

    pub fn record_notification_shown(&self, now: DateTime<Utc>) -> InteractionRecord {
        let record = self.update(now, |r| {
            r.last_notification_shown_at = now;
            r.notification_count += 1;
            r.last_interaction_at = now;
        });
        debug!(count = record.notification_count, "notification shown");
        record
    }

    /// Accepting clears an earlier decline.
    pub fn record_accepted(&self, now: DateTime<Utc>) -> InteractionRecord {
        debug!("incoming call accepted");
        self.update(now, |r| {
            r.user_accepted = true;
            r.user_declined = false;
            r.last_interaction_at = now;
        })
    }

    /// Declining leaves an earlier accept in place.
    pub fn record_declined(&self, now: DateTime<Utc>) -> InteractionRecord {
        debug!("incoming call declined");
        self.update(now, |r| {
            r.user_declined = true;
            r.last_interaction_at = now;
        })
    }

    pub fn record_widget_interaction(&self, now: DateTime<Utc>) -> InteractionRecord {
        self.update(now, |r| r.last_interaction_at = now)
    }

    pub fn reset(&self) {
        if let Err(e) = self.backend.remove(&self.key) {
            warn!(error = %e, "failed to reset interaction record");
        }
    }
}

fn merge_over(fresh: &InteractionRecord, stored: &str) -> Result<InteractionRecord, serde_json::Error> {
    let mut merged = serde_json::to_value(fresh)?;
    if let (Value::Object(base), Value::Object(overlay)) =
        (&mut merged, serde_json::from_str::<Value>(stored)?)
    {
        base.extend(overlay);
    }
    serde_json::from_value(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, minute, 0).unwrap()
    }

    fn store() -> (InteractionStore, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (InteractionStore::new(backend.clone()), backend)
    }

    #[test]
    fn absent_record_is_fresh() {
        let (store, _) = store();
        let record = store.load(at(0));
        assert_eq!(record, InteractionRecord::fresh(at(0)));
        assert_eq!(record.last_interaction_at.timestamp_millis(), 0);
    }

    #[test]
    fn shown_increments_and_touches_interaction() {
        let (store, _) = store();
        store.record_notification_shown(at(1));
        let record = store.record_notification_shown(at(2));
        assert_eq!(record.notification_count, 2);
        assert_eq!(record.last_notification_shown_at, at(2));
        assert_eq!(record.last_interaction_at, at(2));
    }

    #[test]
    fn accept_clears_decline_but_decline_keeps_accept() {
        let (store, _) = store();
        store.record_declined(at(1));
        let accepted = store.record_accepted(at(2));
        assert!(accepted.user_accepted && !accepted.user_declined);

        let declined = store.record_declined(at(3));
        assert!(declined.user_declined);
        assert!(declined.user_accepted);
    }

    #[test]
    fn partial_document_merges_over_defaults() {
        let (store, backend) = store();
        backend
            .set(INTERACTION_STORAGE_KEY, r#"{"notificationCount":3,"userDeclined":true}"#)
            .unwrap();
        let record = store.load(at(5));
        assert_eq!(record.notification_count, 3);
        assert!(record.user_declined);
        assert_eq!(record.session_start, at(5));
    }

    #[test]
    fn corrupt_document_falls_back_to_fresh() {
        let (store, backend) = store();
        backend.set(INTERACTION_STORAGE_KEY, "{not json").unwrap();
        assert_eq!(store.load(at(0)), InteractionRecord::fresh(at(0)));
    }

    #[test]
    fn stored_layout_uses_epoch_millis() {
        let (store, backend) = store();
        store.record_widget_interaction(at(0));
        let text = backend.get(INTERACTION_STORAGE_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["lastInteraction"], at(0).timestamp_millis());
        assert_eq!(value["lastNotificationShown"], 0);
    }

    #[test]
    fn reset_removes_the_record() {
        let (store, backend) = store();
        store.record_accepted(at(0));
        store.reset();
        assert!(backend.get(INTERACTION_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let first = InteractionStore::new(Arc::new(FileStore::new(dir.path())));
        first.record_declined(at(1));

        let second = InteractionStore::new(Arc::new(FileStore::new(dir.path())));
        assert!(second.load(at(2)).user_declined);
    }
}
