// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter lifecycle.

use async_trait::async_trait;

use crate::error::HarkError;
use crate::traits::adapter::PluginAdapter;

/// Lifecycle of a persistence backend holding usage records and transcripts.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), HarkError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), HarkError>;
}
