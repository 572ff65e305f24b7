// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; with no recorder installed every call is a
//! no-op, so library crates can record unconditionally.

use metrics::{describe_counter, describe_histogram};

/// Register all Hark metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("hark_credentials_issued_total", "Media access tokens issued");
    describe_counter!(
        "hark_quota_rejections_total",
        "Token requests refused because the daily limit was reached"
    );
    describe_counter!(
        "hark_usage_minutes_total",
        "Voice minutes added to usage records"
    );
    describe_counter!("hark_transcripts_stored_total", "Transcripts archived");
    describe_histogram!(
        "hark_request_duration_seconds",
        "API request latency in seconds"
    );
}

pub fn record_credential_issued() {
    metrics::counter!("hark_credentials_issued_total").increment(1);
}

pub fn record_quota_rejection() {
    metrics::counter!("hark_quota_rejections_total").increment(1);
}

/// Record minutes forwarded to the ledger.
pub fn record_usage_minutes(minutes: u32) {
    metrics::counter!("hark_usage_minutes_total").increment(u64::from(minutes));
}

/// Record an archived transcript by format version ("1.0" or "2.0").
pub fn record_transcript_stored(format_version: &'static str) {
    metrics::counter!("hark_transcripts_stored_total", "version" => format_version).increment(1);
}

/// Record API request latency for one route and status code.
pub fn record_request(route: &'static str, status: u16, seconds: f64) {
    metrics::histogram!(
        "hark_request_duration_seconds",
        "route" => route,
        "status" => status.to_string()
    )
    .record(seconds);
}
