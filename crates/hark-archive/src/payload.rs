// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two transcript shapes agents submit.

use hark_core::HarkError;
use serde_json::{Map, Value};

/// Message used when a required transcript field is missing or blank.
pub const MISSING_TRANSCRIPT_PARAMETERS: &str =
    "Missing required parameters for transcription storage";

/// A transcript as received, classified once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptPayload {
    /// Flat text from older agents, archived as format "1.0".
    Legacy(String),
    /// A session object (`messages`, `sessionInfo`, ...), archived as "2.0".
    Structured(Map<String, Value>),
}

impl TranscriptPayload {
    /// Classify a JSON value. `None`, `null` and empty strings count as
    /// missing; numbers, booleans and arrays are malformed.
    pub fn from_value(value: Option<Value>) -> Result<Self, HarkError> {
        match value {
            None | Some(Value::Null) => Err(missing()),
            Some(Value::String(text)) if text.is_empty() => Err(missing()),
            Some(Value::String(text)) => Ok(TranscriptPayload::Legacy(text)),
            Some(Value::Object(map)) => Ok(TranscriptPayload::Structured(map)),
            Some(_) => Err(HarkError::Validation(
                "transcription must be a string or an object".to_string(),
            )),
        }
    }

    pub fn format_version(&self) -> &'static str {
        match self {
            TranscriptPayload::Legacy(_) => "1.0",
            TranscriptPayload::Structured(_) => "2.0",
        }
    }

    /// `sessionInfo.totalMessages` for structured payloads, else 0.
    pub fn message_count(&self) -> u64 {
        match self {
            TranscriptPayload::Legacy(_) => 0,
            TranscriptPayload::Structured(map) => map
                .get("sessionInfo")
                .and_then(|info| info.get("totalMessages"))
                .and_then(Value::as_u64)
                .unwrap_or(0),
        }
    }
}

fn missing() -> HarkError {
    HarkError::Validation(MISSING_TRANSCRIPT_PARAMETERS.to_string())
}
