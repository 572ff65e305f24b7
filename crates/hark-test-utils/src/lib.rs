// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Hark integration tests.
//!
//! Provides a service harness over a temporary SQLite database and test
//! doubles for the widget's platform seams, so tests run without a media
//! server, a microphone or a speaker.
//!
//! # Components
//!
//! - [`TestHarness`] - ledger, issuer, archive and gateway over a temp database
//! - [`MockTransport`] / [`MockSession`] - scripted media sessions
//! - [`MockMicrophone`] - grantable or denying capture device
//! - [`MockChimePlayer`] - records chime plays
//! - [`FailingUsageStore`] / [`FailingTranscriptStore`] - injected backend faults

pub mod failing;
pub mod harness;
pub mod mock_audio;
pub mod mock_media;

pub use failing::{FailingTranscriptStore, FailingUsageStore};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_audio::MockChimePlayer;
pub use mock_media::{MockMicrophone, MockSession, MockTransport};
