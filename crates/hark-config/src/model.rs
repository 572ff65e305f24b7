// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Hark service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Product limits (daily minutes, retention, token
//! TTL) are not configuration; see `hark_core::constants`.

use serde::{Deserialize, Serialize};

/// Top-level Hark configuration.
///
/// All sections are optional and default to values suitable for local use.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HarkConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// SQLite backend for usage records and transcripts.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Real-time media server credentials used to sign access tokens.
    #[serde(default)]
    pub media: MediaConfig,

    /// Client fingerprinting.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Prometheus exporter.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

impl HarkConfig {
    /// Copy of this configuration with secrets replaced, for display.
    pub fn redacted(&self) -> HarkConfig {
        let mut copy = self.clone();
        if copy.media.api_secret.is_some() {
            copy.media.api_secret = Some(REDACTED.to_string());
        }
        if copy.identity.fingerprint_key.is_some() {
            copy.identity.fingerprint_key = Some(REDACTED.to_string());
        }
        copy
    }
}

const REDACTED: &str = "<redacted>";

/// Service identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported by the health endpoint.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "hark".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("hark").join("hark.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("hark.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Media server settings. The key and secret sign every access token.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// WebSocket URL clients connect to, echoed to widgets.
    #[serde(default = "default_media_url")]
    pub url: String,

    /// API key, used as the token issuer.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API secret, used as the HS256 signing key.
    #[serde(default)]
    pub api_secret: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            url: default_media_url(),
            api_key: None,
            api_secret: None,
        }
    }
}

fn default_media_url() -> String {
    "ws://127.0.0.1:7880".to_string()
}

/// Client fingerprinting settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// When set, fingerprints are HMAC-SHA256 keyed with this value instead
    /// of a plain SHA-256 digest.
    #[serde(default)]
    pub fingerprint_key: Option<String>,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Serve `/metrics` from the gateway.
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
