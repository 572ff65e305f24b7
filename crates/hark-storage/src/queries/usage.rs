// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage record operations.
//!
//! Both writes are single statements, so concurrent callers never
//! read-modify-write a counter. A row whose `expires_at` is at or before the
//! caller's clock is treated as if it had been deleted.

use chrono::{DateTime, NaiveDate, Utc};
use hark_core::{
    EnsureOutcome, HarkError, SessionIdentifier, UsageContribution, UsageRecord, UserIdentifier,
    usage_key,
};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::millis_to_datetime;

/// Largest counter value a record can hold.
const MAX_USED_MINUTES: i64 = u32::MAX as i64;

const RECORD_COLUMNS: &str = "user_identifier, usage_date, used_minutes, last_session_identifier, \
     last_room_name, created_at, updated_at, expires_at";

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<UsageRecord, rusqlite::Error> {
    let date: String = row.get(1)?;
    let usage_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(UsageRecord {
        user_identifier: UserIdentifier(row.get(0)?),
        usage_date,
        used_minutes: clamp_minutes(row.get(2)?),
        last_session_identifier: row.get::<_, Option<String>>(3)?.map(SessionIdentifier),
        last_room_name: row.get(4)?,
        created_at: millis_to_datetime(5, row.get(5)?)?,
        updated_at: millis_to_datetime(6, row.get(6)?)?,
        expires_at: millis_to_datetime(7, row.get(7)?)?,
    })
}

/// Rows written before the counter saturated may exceed `u32`; they read as full.
fn clamp_minutes(stored: i64) -> u32 {
    u32::try_from(stored.clamp(0, MAX_USED_MINUTES)).unwrap_or(u32::MAX)
}

/// Fetch the live record for `(user, date)`.
pub async fn get_usage(
    db: &Database,
    user: &UserIdentifier,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Option<UsageRecord>, HarkError> {
    let key = usage_key(user, date);
    let now_ms = now.timestamp_millis();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM usage_records WHERE usage_key = ?1 AND expires_at > ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            match stmt.query_row(params![key, now_ms], row_to_record) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert `record` unless a live row already holds its key.
///
/// An expired row is replaced. The conflict branch only fires when the
/// existing row has expired relative to the new record's `created_at`.
pub async fn create_if_absent(
    db: &Database,
    record: &UsageRecord,
) -> Result<EnsureOutcome, HarkError> {
    let key = record.usage_key();
    let record = record.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO usage_records (usage_key, user_identifier, usage_date, used_minutes, \
                 last_session_identifier, last_room_name, created_at, updated_at, expires_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 ON CONFLICT(usage_key) DO UPDATE SET \
                     used_minutes = excluded.used_minutes, \
                     last_session_identifier = excluded.last_session_identifier, \
                     last_room_name = excluded.last_room_name, \
                     created_at = excluded.created_at, \
                     updated_at = excluded.updated_at, \
                     expires_at = excluded.expires_at \
                 WHERE usage_records.expires_at <= excluded.created_at",
                params![
                    key,
                    record.user_identifier.0,
                    record.usage_date.format("%Y-%m-%d").to_string(),
                    record.used_minutes,
                    record.last_session_identifier.map(|s| s.0),
                    record.last_room_name,
                    record.created_at.timestamp_millis(),
                    record.updated_at.timestamp_millis(),
                    record.expires_at.timestamp_millis(),
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;

    Ok(if changed == 0 {
        EnsureOutcome::AlreadyExists
    } else {
        EnsureOutcome::Created
    })
}

/// Add minutes to a day's counter in one upsert.
///
/// Absent or expired rows start at the contributed amount. The counter
/// saturates at `u32::MAX`. Session and room metadata are last-writer-wins.
pub async fn add_minutes(
    db: &Database,
    contribution: &UsageContribution,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<UsageRecord, HarkError> {
    let key = usage_key(&contribution.user_identifier, contribution.usage_date);
    let c = contribution.clone();
    let now_ms = now.timestamp_millis();
    let expires_ms = expires_at.timestamp_millis();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "INSERT INTO usage_records (usage_key, user_identifier, usage_date, used_minutes, \
                 last_session_identifier, last_room_name, created_at, updated_at, expires_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8) \
                 ON CONFLICT(usage_key) DO UPDATE SET \
                     used_minutes = CASE WHEN usage_records.expires_at <= excluded.updated_at \
                         THEN excluded.used_minutes \
                         ELSE MIN(usage_records.used_minutes + excluded.used_minutes, {MAX_USED_MINUTES}) END, \
                     created_at = CASE WHEN usage_records.expires_at <= excluded.updated_at \
                         THEN excluded.created_at ELSE usage_records.created_at END, \
                     last_session_identifier = COALESCE(excluded.last_session_identifier, \
                         usage_records.last_session_identifier), \
                     last_room_name = COALESCE(excluded.last_room_name, usage_records.last_room_name), \
                     updated_at = excluded.updated_at, \
                     expires_at = excluded.expires_at \
                 RETURNING {RECORD_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![
                    key,
                    c.user_identifier.0,
                    c.usage_date.format("%Y-%m-%d").to_string(),
                    c.minutes,
                    c.session_identifier.map(|s| s.0),
                    c.room_name,
                    now_ms,
                    expires_ms,
                ],
                row_to_record,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Delete rows whose retention window has elapsed. Returns the number removed.
pub async fn purge_expired(db: &Database, now: DateTime<Utc>) -> Result<usize, HarkError> {
    let now_ms = now.timestamp_millis();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM usage_records WHERE expires_at <= ?1",
                params![now_ms],
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("usage.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        (dir, db)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn user() -> UserIdentifier {
        UserIdentifier("0123456789abcdef0123456789abcdef".into())
    }

    fn fresh_record(now: DateTime<Utc>) -> UsageRecord {
        UsageRecord {
            user_identifier: user(),
            usage_date: day(),
            used_minutes: 0,
            last_session_identifier: Some(SessionIdentifier("s1".into())),
            last_room_name: Some("room-a".into()),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(16),
        }
    }

    fn contribution(minutes: u32, session: &str) -> UsageContribution {
        UsageContribution {
            user_identifier: user(),
            usage_date: day(),
            minutes,
            session_identifier: Some(SessionIdentifier(session.into())),
            room_name: Some("room-a".into()),
        }
    }

    #[tokio::test]
    async fn get_missing_record_is_none() {
        let (_dir, db) = test_db().await;
        assert!(get_usage(&db, &user(), day(), at(8)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_if_absent_does_not_reset_existing_counter() {
        let (_dir, db) = test_db().await;
        let first = create_if_absent(&db, &fresh_record(at(8))).await.unwrap();
        assert_eq!(first, EnsureOutcome::Created);

        add_minutes(&db, &contribution(7, "s1"), at(9), at(9) + Duration::hours(16))
            .await
            .unwrap();

        let second = create_if_absent(&db, &fresh_record(at(10))).await.unwrap();
        assert_eq!(second, EnsureOutcome::AlreadyExists);

        let record = get_usage(&db, &user(), day(), at(10)).await.unwrap().unwrap();
        assert_eq!(record.used_minutes, 7);
    }

    #[tokio::test]
    async fn create_if_absent_replaces_expired_row() {
        let (_dir, db) = test_db().await;
        let mut old = fresh_record(at(0));
        old.used_minutes = 50;
        old.expires_at = at(2);
        create_if_absent(&db, &old).await.unwrap();

        let outcome = create_if_absent(&db, &fresh_record(at(3))).await.unwrap();
        assert_eq!(outcome, EnsureOutcome::Created);
        let record = get_usage(&db, &user(), day(), at(3)).await.unwrap().unwrap();
        assert_eq!(record.used_minutes, 0);
    }

    #[tokio::test]
    async fn expired_record_is_invisible() {
        let (_dir, db) = test_db().await;
        let mut record = fresh_record(at(0));
        record.expires_at = at(5);
        create_if_absent(&db, &record).await.unwrap();

        assert!(get_usage(&db, &user(), day(), at(4)).await.unwrap().is_some());
        assert!(get_usage(&db, &user(), day(), at(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_minutes_accumulates_and_tracks_last_session() {
        let (_dir, db) = test_db().await;
        let exp = at(12) + Duration::hours(16);
        add_minutes(&db, &contribution(3, "s1"), at(8), exp).await.unwrap();
        let record = add_minutes(&db, &contribution(4, "s2"), at(12), exp).await.unwrap();

        assert_eq!(record.used_minutes, 7);
        assert_eq!(record.last_session_identifier, Some(SessionIdentifier("s2".into())));
        assert_eq!(record.created_at, at(8));
        assert_eq!(record.updated_at, at(12));
        assert_eq!(record.expires_at, exp);
    }

    #[tokio::test]
    async fn add_minutes_saturates_instead_of_overflowing() {
        let (_dir, db) = test_db().await;
        let exp = at(20);
        add_minutes(&db, &contribution(u32::MAX, "s1"), at(8), exp).await.unwrap();
        let record = add_minutes(&db, &contribution(1, "s2"), at(9), exp).await.unwrap();
        assert_eq!(record.used_minutes, u32::MAX);

        let read = get_usage(&db, &user(), day(), at(10)).await.unwrap().unwrap();
        assert_eq!(read.used_minutes, u32::MAX);
    }

    #[test]
    fn oversized_stored_counter_reads_as_full() {
        assert_eq!(clamp_minutes(i64::from(u32::MAX) + 5), u32::MAX);
        assert_eq!(clamp_minutes(-3), 0);
        assert_eq!(clamp_minutes(42), 42);
    }

    #[tokio::test]
    async fn add_minutes_restarts_expired_counter() {
        let (_dir, db) = test_db().await;
        add_minutes(&db, &contribution(40, "s1"), at(0), at(1)).await.unwrap();
        let record = add_minutes(&db, &contribution(2, "s2"), at(2), at(18)).await.unwrap();
        assert_eq!(record.used_minutes, 2);
        assert_eq!(record.created_at, at(2));
    }

    #[tokio::test]
    async fn add_minutes_without_metadata_keeps_previous() {
        let (_dir, db) = test_db().await;
        add_minutes(&db, &contribution(1, "s1"), at(8), at(20)).await.unwrap();
        let mut bare = contribution(1, "unused");
        bare.session_identifier = None;
        bare.room_name = None;
        let record = add_minutes(&db, &bare, at(9), at(20)).await.unwrap();
        assert_eq!(record.last_session_identifier, Some(SessionIdentifier("s1".into())));
        assert_eq!(record.last_room_name.as_deref(), Some("room-a"));
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let (_dir, db) = test_db().await;
        add_minutes(&db, &contribution(1, "s1"), at(0), at(1)).await.unwrap();
        let mut other = contribution(1, "s2");
        other.user_identifier = UserIdentifier("ffffffffffffffffffffffffffffffff".into());
        add_minutes(&db, &other, at(0), at(20)).await.unwrap();

        assert_eq!(purge_expired(&db, at(2)).await.unwrap(), 1);
        assert!(get_usage(&db, &other.user_identifier, day(), at(2)).await.unwrap().is_some());
    }
}
