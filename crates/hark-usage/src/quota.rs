// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota arithmetic: minute rounding, calendar days and reset instants.
//!
//! All calendar computations use UTC.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};
use hark_core::constants::USAGE_RETENTION_HOURS;

/// Round a reported duration up to whole minutes.
///
/// Any positive duration counts as at least one minute. Zero, negative and
/// non-finite durations count as nothing.
pub fn minutes_from_seconds(duration_seconds: f64) -> u32 {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return 0;
    }
    let minutes = (duration_seconds / 60.0).ceil();
    if minutes >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        minutes as u32
    }
}

/// Calendar day a usage contribution at `now` belongs to.
pub fn usage_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Start of the next calendar day, when the daily allowance resets.
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

/// Expiry stamped on a usage record written at `now`.
pub fn retention_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(USAGE_RETENTION_HOURS)
}
