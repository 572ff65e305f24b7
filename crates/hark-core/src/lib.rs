// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Hark voice session service.
//!
//! Holds the error taxonomy, shared record types, fixed product constants,
//! and the storage traits the ledger and archive are written against.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{HarkError, PermissionCause};
pub use types::{
    AdapterType, BestEffort, EnsureOutcome, HealthStatus, SessionIdentifier, TranscriptObject,
    UsageContribution, UsageRecord, UserIdentifier, usage_key,
};

pub use traits::{PluginAdapter, StorageAdapter, TranscriptStore, UsageStore};
