// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Hark voice session service.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer model via
//! `tokio-rusqlite`. Implements `UsageStore` (per-user daily counters with
//! conditional create and atomic add) and `TranscriptStore` (overwrite-on-put
//! transcript objects).

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
