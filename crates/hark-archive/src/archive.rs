// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript storage and usage forwarding.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hark_core::constants::MAX_REPORTED_DURATION_SECONDS;
use hark_core::{HarkError, SessionIdentifier, TranscriptObject, TranscriptStore, UserIdentifier};
use hark_usage::{UsageLedger, minutes_from_seconds};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::payload::{MISSING_TRANSCRIPT_PARAMETERS, TranscriptPayload};

/// A transcript submitted at the end of a session.
#[derive(Debug, Clone)]
pub struct TranscriptSubmission {
    pub payload: TranscriptPayload,
    pub room_name: String,
    pub participant_name: Option<String>,
    pub user_identifier: UserIdentifier,
    pub session_identifier: SessionIdentifier,
    /// Elapsed session time as reported by the agent.
    pub duration_seconds: f64,
    /// Client timestamp in epoch milliseconds; defaults to the store time.
    pub timestamp: Option<i64>,
}

/// Where and when a transcript was written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTranscript {
    pub archive_key: String,
    pub stored_at: DateTime<Utc>,
    pub format_version: &'static str,
    /// Minutes forwarded to the ledger; 0 when no duration was reported.
    pub minutes_recorded: u32,
}

/// `transcriptions/{user}/{room}/{session}.json`
pub fn archive_key(
    user: &UserIdentifier,
    room_name: &str,
    session: &SessionIdentifier,
) -> String {
    format!("transcriptions/{}/{}/{}.json", user.0, room_name, session.0)
}

/// Writes transcript documents and charges their duration to the ledger.
#[derive(Clone)]
pub struct TranscriptArchive {
    store: Arc<dyn TranscriptStore>,
    ledger: UsageLedger,
}

impl TranscriptArchive {
    pub fn new(store: Arc<dyn TranscriptStore>, ledger: UsageLedger) -> Self {
        Self { store, ledger }
    }

    pub async fn store(&self, submission: TranscriptSubmission) -> Result<StoredTranscript, HarkError> {
        self.store_at(submission, Utc::now()).await
    }

    /// Store a transcript as of `now`.
    ///
    /// Fails with `Validation` for missing identifiers and `Storage` if the
    /// write fails. If the write succeeds but the minutes cannot be added,
    /// the result is `UsageNotRecorded`: the transcript is kept and the
    /// accounting failure is reported.
    pub async fn store_at(
        &self,
        submission: TranscriptSubmission,
        now: DateTime<Utc>,
    ) -> Result<StoredTranscript, HarkError> {
        if submission.room_name.trim().is_empty()
            || submission.user_identifier.0.trim().is_empty()
            || submission.session_identifier.0.trim().is_empty()
        {
            return Err(HarkError::Validation(
                MISSING_TRANSCRIPT_PARAMETERS.to_string(),
            ));
        }

        let key = archive_key(
            &submission.user_identifier,
            &submission.room_name,
            &submission.session_identifier,
        );
        let format_version = submission.payload.format_version();
        let message_count = submission.payload.message_count();
        let duration = if submission.duration_seconds.is_finite() {
            submission
                .duration_seconds
                .clamp(0.0, MAX_REPORTED_DURATION_SECONDS)
        } else {
            0.0
        };
        let document = build_document(&submission, duration, now);
        let body = serde_json::to_string_pretty(&document).map_err(HarkError::storage)?;

        let object = TranscriptObject {
            archive_key: key.clone(),
            user_identifier: submission.user_identifier.clone(),
            room_name: submission.room_name.clone(),
            session_identifier: submission.session_identifier.clone(),
            format_version: format_version.to_string(),
            duration_seconds: duration,
            message_count,
            body,
            stored_at: now,
        };
        self.store.put(&object).await?;
        info!(
            user = %submission.user_identifier,
            key = %key,
            version = format_version,
            messages = message_count,
            "transcript stored"
        );

        let minutes = minutes_from_seconds(duration);
        if minutes > 0 {
            self.ledger
                .add_minutes_at(
                    &submission.user_identifier,
                    minutes,
                    Some(&submission.session_identifier),
                    Some(&submission.room_name),
                    now,
                )
                .await
                .map_err(|e| {
                    error!(key = %key, minutes, error = %e, "transcript stored but usage not recorded");
                    HarkError::UsageNotRecorded {
                        archive_key: key.clone(),
                        source: Box::new(e),
                    }
                })?;
        }

        Ok(StoredTranscript {
            archive_key: key,
            stored_at: now,
            format_version,
            minutes_recorded: minutes,
        })
    }

    /// Read back a stored document.
    pub async fn fetch(&self, archive_key: &str) -> Result<Option<Value>, HarkError> {
        match self.store.get(archive_key).await? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(HarkError::storage),
            None => Ok(None),
        }
    }
}

fn build_document(submission: &TranscriptSubmission, duration: f64, now: DateTime<Utc>) -> Value {
    let stored_at = now.timestamp_millis();
    let timestamp = submission.timestamp.unwrap_or(stored_at);
    match &submission.payload {
        TranscriptPayload::Structured(session) => {
            let mut document = session.clone();
            document.insert(
                "apiMetadata".to_string(),
                json!({
                    "roomName": submission.room_name,
                    "participantName": submission.participant_name,
                    "userIdentifier": submission.user_identifier.0,
                    "sessionIdentifier": submission.session_identifier.0,
                    "duration": duration,
                    "timestamp": timestamp,
                    "storedAt": stored_at,
                    "version": "2.0",
                }),
            );
            Value::Object(document)
        }
        TranscriptPayload::Legacy(text) => json!({
            "transcription": text,
            "roomName": submission.room_name,
            "participantName": submission.participant_name,
            "userIdentifier": submission.user_identifier.0,
            "sessionIdentifier": submission.session_identifier.0,
            "duration": duration,
            "timestamp": timestamp,
            "storedAt": stored_at,
            "version": "1.0",
        }),
    }
}
