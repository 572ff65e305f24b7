// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The embeddable voice widget: panel state, voice button, incoming-call
//! popup and the connection controller wired together.
//!
//! Rendering is left to the host. Everything the panel shows is published
//! on a [`watch`] channel as a [`PanelState`].

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::chime::{ChimePlayer, ChimeScheduler};
use crate::connection::{ConnectionController, ConnectionEvent, ConnectionObserver};
use crate::credential::{CredentialSource, HttpCredentialSource};
use crate::interaction::{InteractionRecord, InteractionStore, KeyValueStore};
use crate::options::{VoiceConfig, WidgetOptions};
use crate::popup::{IncomingCallPopup, PopupObserver, PopupOutcome};
use crate::scheduler::{NotificationPolicy, NotificationScheduler};
use crate::transport::{MediaTransport, Microphone};

const START_LABEL: &str = "Start Voice Chat";
const CONNECTING_LABEL: &str = "Connecting...";
const PERMISSION_LABEL: &str = "Requesting Permission...";
const END_LABEL: &str = "End Voice Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StatusKind {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Error,
    AgentJoined,
    AgentLeft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelStatus {
    pub message: String,
    pub kind: StatusKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceButton {
    pub label: String,
    pub disabled: bool,
    /// Styled as an active call.
    pub active: bool,
}

impl VoiceButton {
    fn start(disabled: bool) -> Self {
        Self {
            label: START_LABEL.to_string(),
            disabled,
            active: false,
        }
    }
}

/// Everything the host needs to render the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub status: PanelStatus,
    pub button: VoiceButton,
    pub open: bool,
    /// Pulse the launcher to draw the eye after a declined call.
    pub attention: bool,
    pub voice_enabled: bool,
}

/// Platform pieces the widget drives.
pub struct WidgetDeps {
    pub transport: Arc<dyn MediaTransport>,
    pub microphone: Arc<dyn Microphone>,
    pub chime_player: Arc<dyn ChimePlayer>,
    pub storage: Arc<dyn KeyValueStore>,
}

#[derive(Clone)]
struct Panel(Arc<watch::Sender<PanelState>>);

impl Panel {
    fn status(&self, message: impl Into<String>, kind: StatusKind) {
        let message = message.into();
        self.0.send_modify(|state| state.status = PanelStatus { message, kind });
    }

    fn button(&self, label: &str, disabled: bool, active: bool) {
        self.0.send_modify(|state| {
            state.button = VoiceButton {
                label: label.to_string(),
                disabled,
                active,
            }
        });
    }

    fn reset_button(&self) {
        self.0.send_modify(|state| state.button = VoiceButton::start(false));
    }

    fn update(&self, change: impl FnOnce(&mut PanelState)) {
        self.0.send_modify(change);
    }
}

/// Mirrors controller transitions onto the panel.
struct PanelUpdater {
    panel: Panel,
    popup: IncomingCallPopup,
    agent_name: String,
}

impl ConnectionObserver for PanelUpdater {
    fn on_event(&self, event: &ConnectionEvent) {
        let agent = &self.agent_name;
        match event {
            ConnectionEvent::MicrophonePermissionGranted => {
                self.panel.status("Connecting to voice agent...", StatusKind::Connecting);
                self.panel.button(CONNECTING_LABEL, true, false);
            }
            ConnectionEvent::Connected => {
                self.popup.hide();
                self.panel.status(
                    format!("Connected! You can now talk to {agent}"),
                    StatusKind::Connected,
                );
                self.panel.button(END_LABEL, false, true);
            }
            ConnectionEvent::Disconnected => {
                self.panel
                    .status(format!("Disconnected from {agent}"), StatusKind::Disconnected);
                self.panel.reset_button();
            }
            ConnectionEvent::Error(message) => {
                self.panel
                    .status(format!("Connection error: {message}"), StatusKind::Error);
                self.panel.reset_button();
            }
            ConnectionEvent::ParticipantConnected(_) => {
                self.panel.status(
                    format!("{agent} joined the conversation"),
                    StatusKind::AgentJoined,
                );
            }
            ConnectionEvent::ParticipantDisconnected(_) => {
                self.panel
                    .status(format!("{agent} left the conversation"), StatusKind::AgentLeft);
            }
        }
    }
}

/// A declined or ignored call leaves the launcher pulsing.
struct AttentionOnDecline(Panel);

impl PopupObserver for AttentionOnDecline {
    fn on_outcome(&self, outcome: PopupOutcome) {
        if matches!(outcome, PopupOutcome::Declined | PopupOutcome::TimedOut) {
            self.0.update(|state| state.attention = true);
        }
    }
}

pub struct VoiceWidget {
    options: WidgetOptions,
    transport: Arc<dyn MediaTransport>,
    microphone: Arc<dyn Microphone>,
    panel: Panel,
    popup: IncomingCallPopup,
    chime: Arc<ChimeScheduler>,
    controller: Mutex<Option<ConnectionController>>,
}

impl VoiceWidget {
    /// Build the widget and, if enabled, schedule the incoming call.
    /// Must be called inside a tokio runtime.
    pub fn new(options: WidgetOptions, deps: WidgetDeps) -> Self {
        let auto = &options.auto_incoming_call;
        let scheduler = NotificationScheduler::new(
            NotificationPolicy::from(auto),
            InteractionStore::new(deps.storage),
        );
        let chime = Arc::new(ChimeScheduler::new(auto.sound.clone(), deps.chime_player));
        let popup = IncomingCallPopup::new(auto.clone(), scheduler, Arc::clone(&chime));

        let (sender, _) = watch::channel(PanelState {
            status: PanelStatus {
                message: format!("Ready to help you with {}", options.agent_name),
                kind: StatusKind::Idle,
            },
            button: VoiceButton::start(true),
            open: false,
            attention: false,
            voice_enabled: false,
        });
        let panel = Panel(Arc::new(sender));
        popup.subscribe(Arc::new(AttentionOnDecline(panel.clone())));

        if auto.enabled {
            popup.start();
        }

        Self {
            options,
            transport: deps.transport,
            microphone: deps.microphone,
            panel,
            popup,
            chime,
            controller: Mutex::new(None),
        }
    }

    /// Attach a voice configuration and enable the voice button.
    ///
    /// Re-initialising tears down the previous controller first, leaving any
    /// room it had joined.
    pub async fn initialize(&self, config: VoiceConfig) {
        let credentials = config
            .token_api_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| Arc::new(HttpCredentialSource::new(url)) as Arc<dyn CredentialSource>);

        let controller = ConnectionController::new(
            config,
            Arc::clone(&self.transport),
            Arc::clone(&self.microphone),
            credentials,
        );
        controller.subscribe(Arc::new(PanelUpdater {
            panel: self.panel.clone(),
            popup: self.popup.clone(),
            agent_name: self.options.agent_name.clone(),
        }));

        let previous = self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(controller);
        if let Some(previous) = previous {
            warn!("widget re-initialised; destroying previous voice client");
            previous.destroy().await;
        }

        self.panel.update(|state| {
            state.voice_enabled = true;
            state.button.disabled = false;
        });
        info!(container = %self.options.container_id, "voice widget initialised");
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub fn status(&self) -> watch::Receiver<PanelState> {
        self.panel.0.subscribe()
    }

    pub fn panel(&self) -> PanelState {
        self.panel.0.borrow().clone()
    }

    pub fn popup(&self) -> &IncomingCallPopup {
        &self.popup
    }

    pub fn controller(&self) -> Option<ConnectionController> {
        self.controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Open or close the panel.
    pub fn toggle_panel(&self) {
        self.popup
            .scheduler()
            .store()
            .record_widget_interaction(Utc::now());
        self.panel.update(|state| state.open = !state.open);
    }

    /// The voice button: connect when idle, hang up when connected.
    pub async fn toggle_voice_chat(&self) {
        self.panel.update(|state| state.attention = false);

        let Some(controller) = self.controller() else {
            self.panel.status("Voice client not initialized", StatusKind::Error);
            return;
        };

        if controller.state().is_connected() {
            self.panel.status("Disconnecting...", StatusKind::Disconnecting);
            controller.disconnect().await;
            return;
        }

        self.popup.hide();
        if controller.has_microphone_permission().await {
            self.panel.status("Connecting to voice agent...", StatusKind::Connecting);
            self.panel.button(CONNECTING_LABEL, true, false);
        } else {
            self.panel
                .status("Requesting microphone permission...", StatusKind::Connecting);
            self.panel.button(PERMISSION_LABEL, true, false);
        }

        if let Err(e) = controller.connect().await {
            self.panel.status(format!("Error: {e}"), StatusKind::Error);
            self.panel.reset_button();
        }
    }

    /// Accept the showing incoming call and connect. Returns false if no
    /// call was showing.
    pub async fn accept_incoming_call(&self) -> bool {
        if !self.popup.accept() {
            return false;
        }
        self.panel.update(|state| {
            state.attention = false;
            state.open = true;
        });

        let Some(controller) = self.controller() else {
            self.panel.status("Voice client not initialized", StatusKind::Error);
            return true;
        };
        if controller.has_microphone_permission().await {
            self.panel.status("Connecting to voice agent...", StatusKind::Connecting);
        } else {
            self.panel
                .status("Requesting microphone permission...", StatusKind::Connecting);
        }
        if let Err(e) = controller.connect().await {
            self.panel.status(format!("Error: {e}"), StatusKind::Error);
        }
        true
    }

    /// Decline the showing incoming call. Returns false if none was showing.
    pub fn decline_incoming_call(&self) -> bool {
        self.popup.decline()
    }

    /// Forget the notification history.
    pub fn reset_user_preferences(&self) {
        self.popup.scheduler().store().reset();
    }

    pub fn get_user_stats(&self) -> InteractionRecord {
        self.popup.scheduler().store().load(Utc::now())
    }

    /// Play the chime once. Returns whether it played.
    pub fn test_notification_sound(&self) -> bool {
        self.chime.play_once()
    }

    /// Cancel timers, release audio and leave any voice session.
    pub async fn destroy(&self) {
        self.popup.destroy();
        self.chime.dispose();
        let controller = self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(controller) = controller {
            controller.destroy().await;
        }
        self.panel.update(|state| {
            state.voice_enabled = false;
            state.button.disabled = true;
        });
        info!(container = %self.options.container_id, "voice widget destroyed");
    }
}
