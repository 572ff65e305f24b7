// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed media access tokens.
//!
//! Tokens follow the media server's JWT layout: the API key is the issuer,
//! the participant is the subject, and a `video` grant scopes join, publish
//! and subscribe rights to a single room. Signed HS256 with the API secret.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use hark_config::model::MediaConfig;
use hark_core::HarkError;
use hark_core::constants::CREDENTIAL_TTL_MINUTES;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Room-scoped rights carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room_join: bool,
    pub room: String,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

/// JWT claims of a media access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaClaims {
    pub iss: String,
    pub sub: String,
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    /// JSON-encoded metadata object.
    pub metadata: String,
    pub video: VideoGrant,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// What to put in a token.
#[derive(Debug, Clone)]
pub struct TokenGrant<'a> {
    pub room_name: &'a str,
    pub participant_name: &'a str,
    pub token_id: &'a str,
    pub metadata: serde_json::Value,
    pub attributes: BTreeMap<String, String>,
}

/// A signed token and its validity window.
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs media access tokens with the configured API key pair.
#[derive(Clone)]
pub struct TokenSigner {
    api_key: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(api_key: impl Into<String>, api_secret: &str) -> Self {
        Self {
            api_key: api_key.into(),
            encoding_key: EncodingKey::from_secret(api_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(api_secret.as_bytes()),
            ttl: Duration::minutes(CREDENTIAL_TTL_MINUTES),
        }
    }

    /// Build a signer from `[media]`, failing if the key pair is absent.
    pub fn from_config(config: &MediaConfig) -> Result<Self, HarkError> {
        match (&config.api_key, &config.api_secret) {
            (Some(key), Some(secret)) => Ok(Self::new(key.clone(), secret)),
            _ => Err(HarkError::Config(
                "media.api_key and media.api_secret must be set to issue credentials".into(),
            )),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token valid from `now` for the fixed TTL.
    pub fn mint(&self, grant: &TokenGrant<'_>, now: DateTime<Utc>) -> Result<MintedToken, HarkError> {
        let expires_at = now + self.ttl;
        let claims = MediaClaims {
            iss: self.api_key.clone(),
            sub: grant.participant_name.to_string(),
            name: grant.participant_name.to_string(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: grant.token_id.to_string(),
            metadata: grant.metadata.to_string(),
            video: VideoGrant {
                room_join: true,
                room: grant.room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
            },
            attributes: grant.attributes.clone(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| HarkError::Credential(format!("token signing failed: {e}")))?;

        Ok(MintedToken {
            token,
            issued_at: now,
            expires_at,
        })
    }

    /// Verify a token's signature and issuer and return its claims.
    ///
    /// Expiry is not checked, so historical tokens can be inspected.
    pub fn inspect(&self, token: &str) -> Result<MediaClaims, HarkError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();
        validation.set_issuer(&[self.api_key.as_str()]);
        jsonwebtoken::decode::<MediaClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| HarkError::Credential(format!("token rejected: {e}")))
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("api_key", &self.api_key)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
