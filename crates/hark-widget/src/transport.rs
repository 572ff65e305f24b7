// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams to the real-time media SDK and the capture device.
//!
//! The controller never sees SDK event names: a transport turns them into
//! [`TransportEvent`]s on the channel returned with each session.

use std::sync::Arc;

use async_trait::async_trait;
use hark_core::{HarkError, PermissionCause};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::options::AudioCaptureOptions;

/// Remote activity reported by a live media session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    ParticipantConnected { identity: String },
    ParticipantDisconnected { identity: String },
    /// The server or network ended the session.
    Disconnected { reason: Option<String> },
}

/// A joined media room.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Capture and publish the local microphone track.
    async fn publish_microphone(&self, options: &AudioCaptureOptions) -> Result<(), HarkError>;

    /// Stop publishing the local microphone track.
    async fn unpublish_microphone(&self) -> Result<(), HarkError>;

    /// Whether an unmuted local microphone track is published.
    fn is_microphone_published(&self) -> bool;

    /// Leave the room. Idempotent.
    async fn disconnect(&self);
}

/// A connected session and its event stream.
pub struct SessionLink {
    pub session: Arc<dyn MediaSession>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens media sessions.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Join the room the token is scoped to. Suspends until the server
    /// confirms or the transport's own timeout fires.
    async fn connect(&self, url: &str, token: &str) -> Result<SessionLink, HarkError>;
}

/// Failure to open the capture device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("permission denied")]
    NotAllowed,
    #[error("no capture device")]
    NotFound,
    #[error("{0}")]
    Other(String),
}

/// The local microphone.
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Whether access is already granted. Unknown counts as not granted.
    async fn is_granted(&self) -> bool;

    /// Prompt for access; suspends until the user answers.
    async fn request_access(&self, options: &AudioCaptureOptions) -> Result<(), CaptureError>;
}

/// Translate a capture failure into user-facing copy.
pub fn permission_error(err: CaptureError) -> HarkError {
    let (cause, message) = match err {
        CaptureError::NotAllowed => (
            PermissionCause::Denied,
            "Microphone permission denied. Please allow microphone access to use voice chat."
                .to_string(),
        ),
        CaptureError::NotFound => (
            PermissionCause::DeviceNotFound,
            "No microphone found. Please connect a microphone to use voice chat.".to_string(),
        ),
        CaptureError::Other(detail) => (
            PermissionCause::Other,
            format!("Microphone access error: {detail}"),
        ),
    };
    HarkError::Permission { cause, message }
}
