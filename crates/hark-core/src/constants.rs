// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed product constants. These are deliberately not part of the runtime
//! configuration.

/// Daily allowance of voice minutes per user.
///
/// Raised to compensate for double counting: the agent reports the cumulative
/// session duration several times per call and each report is added to the
/// day's total rather than replacing the running session figure. Lower this
/// only together with a change to the accounting model.
pub const DAILY_LIMIT_MINUTES: u32 = 100;

/// Longest session duration a single transcript report can charge. Longer
/// reports are charged at this value.
pub const MAX_REPORTED_DURATION_SECONDS: f64 = 24.0 * 60.0 * 60.0;

/// How long a usage record stays valid after its last write.
pub const USAGE_RETENTION_HOURS: i64 = 16;

/// Lifetime of a minted media access token.
pub const CREDENTIAL_TTL_MINUTES: i64 = 60;

/// Tag embedded in every credential and echoed in API responses.
pub const AGENT_IDENTIFIER: &str = "hark-faq-agent";

/// Length of the hex fingerprint used as a user identifier.
pub const USER_IDENTIFIER_LEN: usize = 32;

/// Storage key of the persisted notification interaction record.
pub const INTERACTION_STORAGE_KEY: &str = "hark-faq-user-interactions";

/// Participant label used when the embedding page does not provide one.
pub const DEFAULT_PARTICIPANT_NAME: &str = "Web User";
