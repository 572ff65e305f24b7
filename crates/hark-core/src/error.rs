// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hark voice session service.

use thiserror::Error;

/// Why microphone access could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionCause {
    /// The user (or browser policy) refused access.
    Denied,
    /// No capture device is attached.
    DeviceNotFound,
    /// Any other capture failure.
    Other,
}

/// The primary error type used across all Hark crates.
#[derive(Debug, Error)]
pub enum HarkError {
    /// Configuration errors (invalid TOML, missing secrets, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing or malformed request fields. Never retried.
    #[error("{0}")]
    Validation(String),

    /// The caller has used up the daily allowance.
    #[error(
        "Daily usage limit exceeded. You have used {used_minutes} minutes today. Limit: {limit_minutes} minutes."
    )]
    QuotaExceeded { used_minutes: u32, limit_minutes: u32 },

    /// Credential fetch or media handshake failure.
    #[error("{message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Microphone access failure, carrying user-facing copy.
    #[error("{message}")]
    Permission {
        cause: PermissionCause,
        message: String,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The transcript was written but its minutes were not added to the ledger.
    #[error("transcript {archive_key} stored but usage could not be recorded: {source}")]
    UsageNotRecorded {
        archive_key: String,
        source: Box<HarkError>,
    },

    /// Access token could not be minted.
    #[error("credential error: {0}")]
    Credential(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HarkError {
    /// Shorthand for a storage error from any boxed source.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HarkError::Storage {
            source: source.into(),
        }
    }

    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        HarkError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for errors caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HarkError::Validation(_) | HarkError::QuotaExceeded { .. }
        )
    }
}
