// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table.

pub mod transcripts;
pub mod usage;

use chrono::{DateTime, Utc};

/// Convert a stored epoch-millisecond column into a UTC timestamp.
pub(crate) fn millis_to_datetime(idx: usize, millis: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Integer,
            format!("timestamp {millis} out of range").into(),
        )
    })
}
