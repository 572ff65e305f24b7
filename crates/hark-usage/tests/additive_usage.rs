// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage accounting is pure addition: any order of contributions within a
//! day yields the same total.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use hark_config::model::StorageConfig;
use hark_core::{StorageAdapter, UserIdentifier};
use hark_storage::SqliteStorage;
use hark_usage::{UsageLedger, minutes_from_seconds};
use proptest::prelude::*;

fn run_sequence(minutes: &[u32], concurrent: bool) -> u32 {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("props.db").to_string_lossy().into_owned(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        let ledger = UsageLedger::new(Arc::new(storage));
        let user = UserIdentifier("00112233445566778899aabbccddeeff".into());
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();

        if concurrent {
            let mut handles = Vec::new();
            for (i, m) in minutes.iter().copied().enumerate() {
                let ledger = ledger.clone();
                let user = user.clone();
                let now = start + Duration::seconds(i as i64);
                handles.push(tokio::spawn(async move {
                    ledger.add_minutes_at(&user, m, None, None, now).await
                }));
            }
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
        } else {
            for (i, m) in minutes.iter().copied().enumerate() {
                let now = start + Duration::seconds(i as i64);
                ledger.add_minutes_at(&user, m, None, None, now).await.unwrap();
            }
        }

        let end = start + Duration::seconds(minutes.len() as i64);
        ledger.get_usage_at(&user, end).await.used_minutes
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn total_equals_sum_of_contributions(minutes in prop::collection::vec(0u32..120, 1..12)) {
        let expected: u32 = minutes.iter().sum();
        prop_assert_eq!(run_sequence(&minutes, false), expected);
    }

    #[test]
    fn concurrent_contributions_commute(minutes in prop::collection::vec(0u32..120, 1..12)) {
        let expected: u32 = minutes.iter().sum();
        prop_assert_eq!(run_sequence(&minutes, true), expected);
    }

    #[test]
    fn any_positive_duration_counts_at_least_one_minute(seconds in 0.001f64..86_400.0) {
        let minutes = minutes_from_seconds(seconds);
        prop_assert!(minutes >= 1);
        prop_assert!(f64::from(minutes) * 60.0 >= seconds);
        prop_assert!(f64::from(minutes - 1) * 60.0 < seconds);
    }
}
