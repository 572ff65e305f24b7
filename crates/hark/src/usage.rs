// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hark usage` command: today's counter for one user identifier.

use std::sync::Arc;

use hark_config::HarkConfig;
use hark_core::{HarkError, StorageAdapter, UserIdentifier};
use hark_storage::SqliteStorage;
use hark_usage::{UsageLedger, UsageReport};

pub async fn run_usage(config: &HarkConfig, user: &str, json: bool) -> Result<(), HarkError> {
    let user = user.trim();
    if user.is_empty() {
        return Err(HarkError::Validation(
            "Missing required parameter: userIdentifier".into(),
        ));
    }

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let ledger = UsageLedger::new(storage.clone());
    let report = ledger.get_usage(&UserIdentifier(user.to_string())).await;
    storage.close().await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report_json(&report))
            .map_err(|e| HarkError::Internal(e.to_string()))?;
        println!("{rendered}");
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

/// Same field names as the `check-usage` API response.
fn report_json(report: &UsageReport) -> serde_json::Value {
    serde_json::json!({
        "userIdentifier": report.user_identifier,
        "usedMinutes": report.used_minutes,
        "remainingMinutes": report.remaining_minutes(),
        "dailyLimit": report.daily_limit,
        "allowed": report.allowed,
        "resetTime": report.reset_time.timestamp_millis(),
    })
}

fn format_report(report: &UsageReport) -> String {
    let state = if report.allowed { "allowed" } else { "limit reached" };
    format!(
        "user:      {}\nused:      {} / {} minutes ({state})\nremaining: {} minutes\nresets at: {}\n",
        report.user_identifier,
        report.used_minutes,
        report.daily_limit,
        report.remaining_minutes(),
        report.reset_time.format("%Y-%m-%d %H:%M UTC"),
    )
}
