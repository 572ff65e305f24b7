// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client side of Hark: the voice connection state machine, the
//! incoming-call popup with its notification policy and chime, and the
//! widget that ties them to a renderable panel state.
//!
//! Media, microphone, audio output and persistence are injected through
//! traits so the same logic runs against a real SDK or test doubles.

pub mod chime;
pub mod connection;
pub mod credential;
pub mod interaction;
pub mod options;
pub mod popup;
pub mod scheduler;
pub mod transport;
pub mod widget;

pub use chime::{ChimePlayer, ChimeScheduler};
pub use connection::{
    ConnectionController, ConnectionEvent, ConnectionObserver, ConnectionPhase, ConnectionState,
};
pub use credential::{CredentialSource, HttpCredentialSource};
pub use interaction::{FileStore, InteractionRecord, InteractionStore, KeyValueStore, MemoryStore};
pub use options::{
    AudioCaptureOptions, AutoIncomingCallOptions, PopupPosition, SoundOptions, VoiceConfig,
    WidgetOptions, WidgetPosition,
};
pub use popup::{IncomingCallPopup, PopupObserver, PopupOutcome, PopupPhase};
pub use scheduler::{NotificationPolicy, NotificationScheduler, Verdict, evaluate};
pub use transport::{
    CaptureError, MediaSession, MediaTransport, Microphone, SessionLink, TransportEvent,
};
pub use widget::{PanelState, PanelStatus, StatusKind, VoiceButton, VoiceWidget, WidgetDeps};
