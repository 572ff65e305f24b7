// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: listener addresses,
//! paired media credentials, log levels. All failures are collected.

use crate::diagnostic::ConfigError;
use crate::model::HarkConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every failure found rather than stopping at the first.
pub fn validate_config(config: &HarkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let level = config.service.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.gateway.port == 0 {
        fail("gateway.port must be between 1 and 65535".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let url = config.media.url.trim();
    if !["ws://", "wss://", "http://", "https://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        fail(format!(
            "media.url `{url}` must start with ws://, wss://, http:// or https://"
        ));
    }

    match (&config.media.api_key, &config.media.api_secret) {
        (Some(_), None) => fail("media.api_secret is required when media.api_key is set".to_string()),
        (None, Some(_)) => fail("media.api_key is required when media.api_secret is set".to_string()),
        (Some(key), Some(secret)) => {
            if key.trim().is_empty() {
                fail("media.api_key must not be empty".to_string());
            }
            if secret.trim().is_empty() {
                fail("media.api_secret must not be empty".to_string());
            }
        }
        (None, None) => {}
    }

    if let Some(key) = &config.identity.fingerprint_key
        && key.is_empty()
    {
        fail("identity.fingerprint_key must not be empty when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
