// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetching access tokens from the credential API.

use async_trait::async_trait;
use hark_core::HarkError;
use rand::Rng;
use reqwest::header::ACCEPT;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Message used when neither a token nor a token API URL was configured.
pub const TOKEN_URL_REQUIRED: &str =
    "Token API URL is required. Please provide tokenApiUrl in the configuration.";

/// Where the controller gets a token when none was supplied up front.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self, room_name: &str, participant_name: &str) -> Result<String, HarkError>;
}

/// POSTs `{roomName, participantName}` to the credential API.
#[derive(Debug, Clone)]
pub struct HttpCredentialSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCredentialSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn fetch(&self, room_name: &str, participant_name: &str) -> Result<String, HarkError> {
        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .json(&json!({
                "roomName": room_name,
                "participantName": participant_name,
            }))
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string(), Some(Box::new(e))))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "token API rejected request");
            let detail = match status.canonical_reason() {
                Some(reason) => format!("Token API request failed: {} {reason}", status.as_u16()),
                None => format!("Token API request failed: {}", status.as_u16()),
            };
            return Err(fetch_failed(detail, None));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_failed(e.to_string(), Some(Box::new(e))))?;
        let token = parse_token_body(&body).map_err(|detail| fetch_failed(detail, None))?;
        debug!(room = room_name, "access token fetched");
        Ok(token)
    }
}

/// Accept `{"data": {"token": ...}}` or a bare token string.
pub fn parse_token_body(body: &str) -> Result<String, String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(token)) if !token.is_empty() => Ok(token),
        Ok(value) => value
            .pointer("/data/token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| "response did not contain a token".to_string()),
        Err(_) => {
            let token = body.trim();
            if token.is_empty() {
                Err("empty response".to_string())
            } else {
                Ok(token.to_string())
            }
        }
    }
}

fn fetch_failed(
    detail: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
) -> HarkError {
    HarkError::Transport {
        message: format!("Token generation failed: {detail}"),
        source,
    }
}

/// `demo-{epoch millis}-{random base36}-{uuid v4}`
pub fn random_room_name() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let random: String = (0..11)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!(
        "demo-{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        random,
        uuid::Uuid::new_v4()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_envelope_token() {
        let body = r#"{"success":true,"data":{"token":"eyJ.abc.def","sessionIdentifier":"s"}}"#;
        assert_eq!(parse_token_body(body).unwrap(), "eyJ.abc.def");
    }

    #[test]
    fn plain_text_token() {
        assert_eq!(parse_token_body("eyJ.abc.def\n").unwrap(), "eyJ.abc.def");
    }

    #[test]
    fn json_without_token_is_an_error() {
        assert!(parse_token_body(r#"{"success":false,"error":"x"}"#).is_err());
        assert!(parse_token_body("").is_err());
    }

    #[test]
    fn room_names_are_unique_and_prefixed() {
        let a = random_room_name();
        let b = random_room_name();
        assert!(a.starts_with("demo-"));
        assert_ne!(a, b);
        // demo, millis, random, then the five uuid groups
        assert_eq!(a.split('-').count(), 8);
    }
}
