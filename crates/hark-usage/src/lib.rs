// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily voice-minute accounting for the Hark service.
//!
//! - **Ledger**: ensure/get/add over a `UsageStore`, with fail-open reads
//!   and an 80% warning
//! - **Quota**: minute rounding, UTC calendar days and reset instants

pub mod ledger;
pub mod quota;

pub use ledger::{UsageLedger, UsageReport};
pub use quota::{minutes_from_seconds, next_reset};
