// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./hark.toml` > `~/.config/hark/hark.toml` > `/etc/hark/hark.toml`
//! with environment variable overrides via `HARK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HarkConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hark/hark.toml` (system-wide)
/// 3. `~/.config/hark/hark.toml` (user XDG config)
/// 4. `./hark.toml` (local directory)
/// 5. `HARK_*` environment variables
pub fn load_config() -> Result<HarkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<HarkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HarkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HarkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HarkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HarkConfig::default()))
        .merge(Toml::file("/etc/hark/hark.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("hark/hark.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("hark.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so keys containing
/// underscores survive: `HARK_MEDIA_API_SECRET` maps to `media.api_secret`,
/// not `media.api.secret`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("HARK_").map(|key| {
        let key_str = key.as_str();
        let mapped = ["service", "gateway", "storage", "media", "identity", "prometheus"]
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
