// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object store for session transcripts.

use async_trait::async_trait;

use crate::error::HarkError;
use crate::types::TranscriptObject;

/// Durable, keyed storage of transcript documents. Writing an existing key
/// overwrites it.
#[async_trait]
pub trait TranscriptStore: Send + Sync + 'static {
    async fn put(&self, object: &TranscriptObject) -> Result<(), HarkError>;

    /// Returns the stored JSON document, if present.
    async fn get(&self, archive_key: &str) -> Result<Option<String>, HarkError>;
}
