// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Backends extend the [`PluginAdapter`] base trait and use `#[async_trait]`
//! for dynamic dispatch compatibility.

pub mod adapter;
pub mod archive;
pub mod storage;
pub mod usage;

pub use adapter::PluginAdapter;
pub use archive::TranscriptStore;
pub use storage::StorageAdapter;
pub use usage::UsageStore;
