// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript object operations. Writes overwrite; nothing merges.

use hark_core::{HarkError, TranscriptObject};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Write (or overwrite) a transcript object.
pub async fn put_transcript(db: &Database, object: &TranscriptObject) -> Result<(), HarkError> {
    let object = object.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO transcripts (archive_key, user_identifier, room_name, \
                 session_identifier, format_version, duration_seconds, message_count, body, stored_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    object.archive_key,
                    object.user_identifier.0,
                    object.room_name,
                    object.session_identifier.0,
                    object.format_version,
                    object.duration_seconds,
                    object.message_count as i64,
                    object.body,
                    object.stored_at.timestamp_millis(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the stored document body for `archive_key`.
pub async fn get_transcript(db: &Database, archive_key: &str) -> Result<Option<String>, HarkError> {
    let key = archive_key.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT body FROM transcripts WHERE archive_key = ?1",
                params![key],
                |row| row.get(0),
            ) {
                Ok(body) => Ok(Some(body)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Number of transcripts stored for a user.
pub async fn count_for_user(db: &Database, user_identifier: &str) -> Result<u64, HarkError> {
    let user = user_identifier.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM transcripts WHERE user_identifier = ?1",
                params![user],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}
