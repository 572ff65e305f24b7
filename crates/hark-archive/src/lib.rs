// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript archive for Hark voice sessions.
//!
//! Classifies a submitted transcript as legacy text or a structured session
//! object, writes it under a key derived from user, room and session, and
//! charges the reported duration to the usage ledger.

pub mod archive;
pub mod payload;

pub use archive::{StoredTranscript, TranscriptArchive, TranscriptSubmission, archive_key};
pub use payload::{MISSING_TRANSCRIPT_PARAMETERS, TranscriptPayload};
