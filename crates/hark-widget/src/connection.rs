// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side voice connection state machine.
//!
//! ```text
//! idle -> requesting_permission -> connecting -> connected -> disconnecting -> idle
//!              |                       |
//!              +------> error <--------+
//! ```
//!
//! One connection attempt at a time: `connect()` while an attempt is in
//! flight or a session is live returns immediately. Observers are called
//! synchronously, after the state they report has been stored and with no
//! lock held.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hark_core::HarkError;
use strum::Display;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credential::{CredentialSource, TOKEN_URL_REQUIRED, random_room_name};
use crate::options::VoiceConfig;
use crate::transport::{
    MediaSession, MediaTransport, Microphone, TransportEvent, permission_error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionPhase {
    Idle,
    RequestingPermission,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

/// Snapshot of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    pub last_error: Option<String>,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self.phase,
            ConnectionPhase::RequestingPermission | ConnectionPhase::Connecting
        )
    }
}

/// Transitions reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    MicrophonePermissionGranted,
    Connected,
    Disconnected,
    Error(String),
    ParticipantConnected(String),
    ParticipantDisconnected(String),
}

pub trait ConnectionObserver: Send + Sync {
    fn on_event(&self, event: &ConnectionEvent);
}

struct Inner {
    phase: ConnectionPhase,
    last_error: Option<String>,
    /// Bumped by every `connect()` and by `destroy()`; a result from an older
    /// attempt is discarded.
    attempt: u64,
    session: Option<Arc<dyn MediaSession>>,
    events_cancel: Option<CancellationToken>,
}

struct Shared {
    config: VoiceConfig,
    transport: Arc<dyn MediaTransport>,
    microphone: Arc<dyn Microphone>,
    credentials: Option<Arc<dyn CredentialSource>>,
    observers: Mutex<Vec<Arc<dyn ConnectionObserver>>>,
    inner: Mutex<Inner>,
}

/// Drives one widget's voice connection.
#[derive(Clone)]
pub struct ConnectionController {
    shared: Arc<Shared>,
}

impl ConnectionController {
    pub fn new(
        config: VoiceConfig,
        transport: Arc<dyn MediaTransport>,
        microphone: Arc<dyn Microphone>,
        credentials: Option<Arc<dyn CredentialSource>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                microphone,
                credentials,
                observers: Mutex::new(Vec::new()),
                inner: Mutex::new(Inner {
                    phase: ConnectionPhase::Idle,
                    last_error: None,
                    attempt: 0,
                    session: None,
                    events_cancel: None,
                }),
            }),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn ConnectionObserver>) {
        self.shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn state(&self) -> ConnectionState {
        let inner = self.inner();
        ConnectionState {
            phase: inner.phase,
            last_error: inner.last_error.clone(),
        }
    }

    /// Whether microphone access is already granted.
    pub async fn has_microphone_permission(&self) -> bool {
        self.shared.microphone.is_granted().await
    }

    /// Ask for microphone access ahead of a call. Never fails; returns
    /// whether access is available afterwards.
    pub async fn pre_request_microphone_permission(&self) -> bool {
        if self.shared.microphone.is_granted().await {
            return true;
        }
        match self
            .shared
            .microphone
            .request_access(&self.shared.config.audio)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "microphone pre-request failed");
                false
            }
        }
    }

    /// Start a session. No-op while connecting or connected.
    ///
    /// On failure the controller moves to `Error`, observers receive
    /// [`ConnectionEvent::Error`], and the error is returned.
    pub async fn connect(&self) -> Result<(), HarkError> {
        let granted = self.shared.microphone.is_granted().await;
        let attempt = {
            let mut inner = self.inner();
            if matches!(
                inner.phase,
                ConnectionPhase::RequestingPermission
                    | ConnectionPhase::Connecting
                    | ConnectionPhase::Connected
                    | ConnectionPhase::Disconnecting
            ) {
                debug!(phase = %inner.phase, "connect ignored");
                return Ok(());
            }
            inner.attempt += 1;
            inner.phase = if granted {
                ConnectionPhase::Connecting
            } else {
                ConnectionPhase::RequestingPermission
            };
            inner.last_error = None;
            inner.attempt
        };

        match self.establish(attempt, granted).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let current = {
                    let mut inner = self.inner();
                    let current = inner.attempt == attempt;
                    if current {
                        inner.phase = ConnectionPhase::Error;
                        inner.last_error = Some(e.to_string());
                    }
                    current
                };
                if current {
                    warn!(error = %e, "voice connection failed");
                    self.emit(&ConnectionEvent::Error(e.to_string()));
                }
                Err(e)
            }
        }
    }

    async fn establish(&self, attempt: u64, granted: bool) -> Result<(), HarkError> {
        let config = &self.shared.config;

        if !granted {
            self.shared
                .microphone
                .request_access(&config.audio)
                .await
                .map_err(permission_error)?;
        }
        self.advance(attempt, ConnectionPhase::Connecting)?;
        self.emit(&ConnectionEvent::MicrophonePermissionGranted);

        let token = match config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => {
                let source = self
                    .shared
                    .credentials
                    .as_ref()
                    .ok_or_else(|| HarkError::transport(TOKEN_URL_REQUIRED))?;
                let room_name = config
                    .room_name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(random_room_name);
                source.fetch(&room_name, config.participant_name()).await?
            }
        };
        self.ensure_current(attempt)?;

        let link = self
            .shared
            .transport
            .connect(&config.media_url, &token)
            .await?;
        if let Err(e) = link.session.publish_microphone(&config.audio).await {
            link.session.disconnect().await;
            return Err(e);
        }

        let events_cancel = CancellationToken::new();
        let installed = {
            let mut inner = self.inner();
            if inner.attempt == attempt {
                inner.phase = ConnectionPhase::Connected;
                inner.session = Some(Arc::clone(&link.session));
                inner.events_cancel = Some(events_cancel.clone());
                true
            } else {
                false
            }
        };
        if !installed {
            debug!("connection attempt superseded, leaving room");
            link.session.disconnect().await;
            return Err(superseded());
        }

        self.spawn_event_pump(attempt, link.events, events_cancel);
        info!(url = %config.media_url, "voice session connected");
        self.emit(&ConnectionEvent::Connected);
        Ok(())
    }

    fn spawn_event_pump(
        &self,
        attempt: u64,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        cancel: CancellationToken,
    ) {
        let controller = self.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Some(TransportEvent::ParticipantConnected { identity }) => {
                        controller.emit(&ConnectionEvent::ParticipantConnected(identity));
                    }
                    Some(TransportEvent::ParticipantDisconnected { identity }) => {
                        controller.emit(&ConnectionEvent::ParticipantDisconnected(identity));
                    }
                    Some(TransportEvent::Disconnected { reason }) => {
                        controller.remote_disconnect(attempt, reason);
                        break;
                    }
                    None => {
                        controller.remote_disconnect(attempt, Some("event stream closed".into()));
                        break;
                    }
                }
            }
        });
    }

    fn remote_disconnect(&self, attempt: u64, reason: Option<String>) {
        let was_live = {
            let mut inner = self.inner();
            if inner.attempt == attempt && inner.phase == ConnectionPhase::Connected {
                inner.phase = ConnectionPhase::Idle;
                inner.session = None;
                inner.events_cancel = None;
                true
            } else {
                false
            }
        };
        if was_live {
            info!(reason = reason.as_deref().unwrap_or("none"), "voice session ended remotely");
            self.emit(&ConnectionEvent::Disconnected);
        }
    }

    /// Leave the room. Ignored unless connected.
    pub async fn disconnect(&self) {
        let (session, cancel) = {
            let mut inner = self.inner();
            if inner.phase != ConnectionPhase::Connected {
                debug!(phase = %inner.phase, "disconnect ignored");
                return;
            }
            inner.phase = ConnectionPhase::Disconnecting;
            (inner.session.take(), inner.events_cancel.take())
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(session) = session {
            session.disconnect().await;
        }
        {
            let mut inner = self.inner();
            if inner.phase == ConnectionPhase::Disconnecting {
                inner.phase = ConnectionPhase::Idle;
            }
        }
        info!("voice session disconnected");
        self.emit(&ConnectionEvent::Disconnected);
    }

    /// Tear down unconditionally and return to `Idle`.
    ///
    /// An attempt still in flight is invalidated and leaves its room as soon
    /// as it returns.
    pub async fn destroy(&self) {
        let (session, cancel) = {
            let mut inner = self.inner();
            inner.attempt += 1;
            inner.phase = ConnectionPhase::Idle;
            inner.last_error = None;
            (inner.session.take(), inner.events_cancel.take())
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(session) = session {
            session.disconnect().await;
            self.emit(&ConnectionEvent::Disconnected);
        }
    }

    pub fn is_microphone_enabled(&self) -> bool {
        self.inner()
            .session
            .as_ref()
            .is_some_and(|session| session.is_microphone_published())
    }

    /// Flip the microphone. Returns the new enabled state.
    pub async fn toggle_microphone(&self) -> Result<bool, HarkError> {
        let session = self
            .inner()
            .session
            .clone()
            .ok_or_else(|| HarkError::transport("Not connected to room"))?;
        if session.is_microphone_published() {
            session.unpublish_microphone().await?;
            Ok(false)
        } else {
            session.publish_microphone(&self.shared.config.audio).await?;
            Ok(true)
        }
    }

    fn advance(&self, attempt: u64, phase: ConnectionPhase) -> Result<(), HarkError> {
        let mut inner = self.inner();
        if inner.attempt != attempt {
            return Err(superseded());
        }
        inner.phase = phase;
        Ok(())
    }

    fn ensure_current(&self, attempt: u64) -> Result<(), HarkError> {
        if self.inner().attempt == attempt {
            Ok(())
        } else {
            Err(superseded())
        }
    }

    fn emit(&self, event: &ConnectionEvent) {
        let observers = self
            .shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_event(event);
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn superseded() -> HarkError {
    HarkError::transport("Connection attempt cancelled")
}
