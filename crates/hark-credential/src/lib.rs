// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media credential issuance for Hark voice sessions.
//!
//! Fingerprints the requester, checks the daily usage ledger, mints a
//! short-lived room-scoped token and records the session start on a
//! best-effort basis.

pub mod fingerprint;
pub mod issuer;
pub mod token;

pub use fingerprint::{Fingerprinter, new_session_identifier};
pub use issuer::{CredentialIssuer, CredentialRequest, IssuedCredential, MISSING_PARAMETERS};
pub use token::{MediaClaims, TokenSigner, VideoGrant};
