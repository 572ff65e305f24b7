// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock media transport and microphone for deterministic widget tests.
//!
//! `MockTransport` hands out [`MockSession`]s whose remote events are
//! injected by the test. A transport can be gated so `connect()` suspends
//! until the test releases it, which is how in-flight attempts are tested.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hark_core::HarkError;
use hark_widget::{
    AudioCaptureOptions, CaptureError, MediaSession, MediaTransport, Microphone, SessionLink,
    TransportEvent,
};
use tokio::sync::{Notify, mpsc};

/// A joined room under test control.
pub struct MockSession {
    published: AtomicBool,
    disconnected: AtomicBool,
    fail_publish: bool,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MockSession {
    /// Deliver a remote event to the controller.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    /// Simulate the agent joining.
    pub fn agent_joins(&self, identity: &str) {
        self.emit(TransportEvent::ParticipantConnected {
            identity: identity.to_string(),
        });
    }

    /// Simulate the server closing the room.
    pub fn end_remotely(&self) {
        self.emit(TransportEvent::Disconnected {
            reason: Some("room closed".into()),
        });
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSession for MockSession {
    async fn publish_microphone(&self, _options: &AudioCaptureOptions) -> Result<(), HarkError> {
        if self.fail_publish {
            return Err(HarkError::transport("could not publish microphone track"));
        }
        self.published.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn unpublish_microphone(&self) -> Result<(), HarkError> {
        self.published.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_microphone_published(&self) -> bool {
        self.published.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.published.store(false, Ordering::SeqCst);
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

/// Hands out [`MockSession`]s and remembers every connect.
#[derive(Default)]
pub struct MockTransport {
    connects: AtomicUsize,
    gate: Option<Arc<Notify>>,
    failure: Mutex<Option<String>>,
    fail_publish: AtomicBool,
    tokens: Mutex<Vec<String>>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `connect()` suspends until the returned `Notify` is signalled once
    /// per connect.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let transport = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (transport, gate)
    }

    /// Every handshake fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let transport = Self::default();
        *transport.failure.lock().unwrap() = Some(message.into());
        transport
    }

    /// Sessions connect but refuse the microphone track.
    pub fn set_publish_failure(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Tokens presented to `connect()`, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    async fn connect(&self, _url: &str, token: &str) -> Result<SessionLink, HarkError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(HarkError::transport(message));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(MockSession {
            published: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
            fail_publish: self.fail_publish.load(Ordering::SeqCst),
            events: tx,
        });
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(SessionLink {
            session,
            events: rx,
        })
    }
}

/// A capture device whose permission answer is scripted.
pub struct MockMicrophone {
    granted: AtomicBool,
    answer: Mutex<Result<(), CaptureError>>,
    requests: AtomicUsize,
}

impl MockMicrophone {
    /// Access already granted; never prompts.
    pub fn granted() -> Self {
        Self {
            granted: AtomicBool::new(true),
            answer: Mutex::new(Ok(())),
            requests: AtomicUsize::new(0),
        }
    }

    /// Not yet granted; the prompt is accepted.
    pub fn prompting() -> Self {
        Self {
            granted: AtomicBool::new(false),
            answer: Mutex::new(Ok(())),
            requests: AtomicUsize::new(0),
        }
    }

    /// Not granted; the prompt fails with `error`.
    pub fn refusing(error: CaptureError) -> Self {
        Self {
            granted: AtomicBool::new(false),
            answer: Mutex::new(Err(error)),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Microphone for MockMicrophone {
    async fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    async fn request_access(&self, _options: &AudioCaptureOptions) -> Result<(), CaptureError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer.lock().unwrap().clone();
        if answer.is_ok() {
            self.granted.store(true, Ordering::SeqCst);
        }
        answer
    }
}
