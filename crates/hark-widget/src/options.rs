// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Widget and voice session options as supplied by the embedding page.
//!
//! Every field is optional in JSON; missing fields take the defaults below.

use std::time::Duration;

use hark_core::constants::DEFAULT_PARTICIPANT_NAME;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Corner of the page the launcher sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WidgetPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

/// Where the incoming-call popup appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PopupPosition {
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
    #[default]
    BottomCenter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundOptions {
    pub enabled: bool,
    /// 0.0 to 1.0.
    pub volume: f32,
    /// Cap the chime at the reported system volume.
    pub respect_system_volume: bool,
    pub max_duration_ms: u64,
    /// 0 plays the chime once per popup.
    pub repeat_interval_ms: u64,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.2,
            respect_system_volume: true,
            max_duration_ms: 2_000,
            repeat_interval_ms: 5_000,
        }
    }
}

impl SoundOptions {
    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }

    pub fn repeat_interval(&self) -> Option<Duration> {
        (self.repeat_interval_ms > 0).then(|| Duration::from_millis(self.repeat_interval_ms))
    }
}

/// Incoming-call popup behaviour.
///
/// A zero `cooldown_ms`, `max_notifications_per_session` or
/// `reset_after_days` disables that check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoIncomingCallOptions {
    pub enabled: bool,
    pub delay_ms: u64,
    /// 0 keeps the popup up until the user acts.
    pub timeout_ms: u64,
    pub position: PopupPosition,
    pub respect_user_choice: bool,
    pub cooldown_ms: u64,
    pub max_notifications_per_session: u32,
    pub reset_after_days: u32,
    /// Show the popup on every page load, ignoring history.
    pub developer_mode: bool,
    pub sound: SoundOptions,
}

impl Default for AutoIncomingCallOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 5_000,
            timeout_ms: 20_000,
            position: PopupPosition::BottomCenter,
            respect_user_choice: true,
            cooldown_ms: 30 * 60 * 1_000,
            max_notifications_per_session: 2,
            reset_after_days: 7,
            developer_mode: false,
            sound: SoundOptions::default(),
        }
    }
}

impl AutoIncomingCallOptions {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetOptions {
    pub container_id: String,
    pub button_text: String,
    pub agent_name: String,
    pub position: WidgetPosition,
    pub auto_incoming_call: AutoIncomingCallOptions,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            container_id: "hark-faq-widget".to_string(),
            button_text: "Ask Hark".to_string(),
            agent_name: "Hark".to_string(),
            position: WidgetPosition::BottomRight,
            auto_incoming_call: AutoIncomingCallOptions::default(),
        }
    }
}

/// Microphone capture constraints, all on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioCaptureOptions {
    #[serde(rename = "enableEchoCancellation")]
    pub echo_cancellation: bool,
    #[serde(rename = "enableNoiseSuppression")]
    pub noise_suppression: bool,
    #[serde(rename = "autoGainControl")]
    pub auto_gain_control: bool,
}

impl Default for AudioCaptureOptions {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Per-page voice session settings passed to `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    /// Media server URL.
    #[serde(alias = "livekitUrl")]
    pub media_url: String,
    /// Pre-minted token; when absent one is fetched from `token_api_url`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_api_url: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub participant_name: Option<String>,
    #[serde(flatten)]
    pub audio: AudioCaptureOptions,
}

impl VoiceConfig {
    pub fn new(media_url: impl Into<String>) -> Self {
        Self {
            media_url: media_url.into(),
            token: None,
            token_api_url: None,
            room_name: None,
            participant_name: None,
            audio: AudioCaptureOptions::default(),
        }
    }

    pub fn participant_name(&self) -> &str {
        self.participant_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PARTICIPANT_NAME)
    }
}
