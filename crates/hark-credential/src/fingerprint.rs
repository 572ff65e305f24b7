// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pseudonymous user identifiers and random session identifiers.
//!
//! A fingerprint is a one-way digest of the client's observed network
//! address, truncated to [`USER_IDENTIFIER_LEN`] hex characters. Clients
//! behind one NAT or proxy share a fingerprint, and a client that changes
//! address gets a new one; it deters abuse but does not identify anyone.

use hark_core::constants::USER_IDENTIFIER_LEN;
use hark_core::{SessionIdentifier, UserIdentifier};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Derives user identifiers from client addresses.
#[derive(Clone, Default)]
pub struct Fingerprinter {
    key: Option<Vec<u8>>,
}

impl Fingerprinter {
    /// Plain SHA-256 fingerprints.
    pub fn unkeyed() -> Self {
        Self { key: None }
    }

    /// HMAC-SHA256 fingerprints under `key`, so identifiers cannot be
    /// recomputed from an address without the key.
    pub fn keyed(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    /// Fingerprint a client address. The raw address is not retained.
    pub fn fingerprint(&self, client_address: &str) -> UserIdentifier {
        let digest = match &self.key {
            Some(key) => match HmacSha256::new_from_slice(key) {
                Ok(mut mac) => {
                    mac.update(client_address.as_bytes());
                    hex::encode(mac.finalize().into_bytes())
                }
                // HMAC accepts keys of any length.
                Err(_) => hex::encode(Sha256::digest(client_address.as_bytes())),
            },
            None => hex::encode(Sha256::digest(client_address.as_bytes())),
        };
        UserIdentifier(digest[..USER_IDENTIFIER_LEN].to_string())
    }
}

impl std::fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("keyed", &self.is_keyed())
            .finish()
    }
}

/// 16 random bytes from the OS generator, hex encoded.
pub fn new_session_identifier() -> SessionIdentifier {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    SessionIdentifier(hex::encode(bytes))
}
