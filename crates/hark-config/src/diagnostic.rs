// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics.
//!
//! Hark's config is six flat sections, so an error names the dotted key and
//! the layer it came from (a file path or the `HARK_*` environment) instead
//! of pointing into the TOML source.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::Diagnostic;
use thiserror::Error;

/// Minimum Jaro-Winkler score for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(hark::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys, origin.as_deref()))
    )]
    UnknownKey {
        key: String,
        /// Empty for top-level keys.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        origin: Option<String>,
    },

    /// Wrong type or unparsable value, e.g. `port = "eighty"` or a
    /// non-numeric `HARK_GATEWAY_PORT`.
    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(
        code(hark::config::invalid_value),
        help("{}", origin.as_ref().map(|o| format!("set in {o}")).unwrap_or_default())
    )]
    InvalidValue {
        key: String,
        detail: String,
        origin: Option<String>,
    },

    #[error("validation error: {message}")]
    #[diagnostic(code(hark::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(hark::config::other))]
    Other(String),
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str, origin: Option<&str>) -> String {
    let mut help = match suggestion {
        Some(s) => format!("did you mean `{s}`? valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    };
    if let Some(origin) = origin {
        help.push_str(&format!(" (from {origin})"));
    }
    help
}

/// Where a figment error came from: the file path, or the provider name for
/// env overrides and defaults.
fn origin(error: &figment::Error) -> Option<String> {
    let metadata = error.metadata.as_ref()?;
    match &metadata.source {
        Some(figment::Source::File(path)) => Some(path.display().to_string()),
        _ => Some(metadata.name.to_string()),
    }
}

/// Split a figment error (which may hold several) into diagnostics.
pub fn from_figment(err: figment::Error) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => ConfigError::UnknownKey {
                    key: field.clone(),
                    section: path.join("."),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    origin: origin(&error),
                },
                Kind::InvalidType(actual, expected) => ConfigError::InvalidValue {
                    key: path.join("."),
                    detail: format!("found {actual}, expected {expected}"),
                    origin: origin(&error),
                },
                Kind::InvalidValue(actual, expected) => ConfigError::InvalidValue {
                    key: path.join("."),
                    detail: format!("found {actual}, expected {expected}"),
                    origin: origin(&error),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

pub fn render_to_string(errors: &[ConfigError]) -> String {
    let handler = miette::GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler
            .render_report(&mut out, error as &dyn Diagnostic)
            .is_err()
        {
            out.push_str(&format!("Error: {error}\n"));
        }
    }
    out
}

/// Print diagnostics to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_to_string(errors));
}
