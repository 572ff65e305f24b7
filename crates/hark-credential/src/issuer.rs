// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential issuance gated by the daily usage quota.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hark_core::constants::AGENT_IDENTIFIER;
use hark_core::{BestEffort, EnsureOutcome, HarkError, SessionIdentifier, UserIdentifier};
use hark_usage::UsageLedger;
use serde_json::json;
use tracing::{info, warn};

use crate::fingerprint::{Fingerprinter, new_session_identifier};
use crate::token::{TokenGrant, TokenSigner};

/// Message used for both missing and blank room/participant names.
pub const MISSING_PARAMETERS: &str = "Missing required parameters: roomName and participantName";

/// A request for a media credential.
#[derive(Debug, Clone)]
pub struct CredentialRequest {
    pub room_name: String,
    pub participant_name: String,
    /// Observed network address of the requester; only its fingerprint is kept.
    pub client_address: String,
}

/// A minted credential and the bookkeeping around it.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub session_identifier: SessionIdentifier,
    pub user_identifier: UserIdentifier,
    pub agent_identifier: &'static str,
    /// Allowance left before this session; the session itself is not counted.
    pub remaining_minutes: u32,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Outcome of the session-start record write.
    pub bookkeeping: BestEffort<EnsureOutcome>,
}

/// Validates requests, enforces the quota and mints tokens.
#[derive(Clone)]
pub struct CredentialIssuer {
    ledger: UsageLedger,
    signer: TokenSigner,
    fingerprinter: Fingerprinter,
}

impl CredentialIssuer {
    pub fn new(ledger: UsageLedger, signer: TokenSigner, fingerprinter: Fingerprinter) -> Self {
        Self {
            ledger,
            signer,
            fingerprinter,
        }
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }

    pub async fn issue(&self, request: &CredentialRequest) -> Result<IssuedCredential, HarkError> {
        self.issue_at(request, Utc::now()).await
    }

    /// Issue a credential as of `now`.
    ///
    /// Fails with `Validation` for blank names, `QuotaExceeded` when the
    /// user is at or over the limit, and `Credential` if signing fails. A
    /// failed session-start write never fails issuance.
    pub async fn issue_at(
        &self,
        request: &CredentialRequest,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, HarkError> {
        let room_name = request.room_name.trim();
        let participant_name = request.participant_name.trim();
        if room_name.is_empty() || participant_name.is_empty() {
            return Err(HarkError::Validation(MISSING_PARAMETERS.to_string()));
        }

        let user = self.fingerprinter.fingerprint(&request.client_address);

        let usage = self.ledger.get_usage_at(&user, now).await;
        if !usage.allowed {
            info!(user = %user, used_minutes = usage.used_minutes, "credential refused: daily limit reached");
            return Err(HarkError::QuotaExceeded {
                used_minutes: usage.used_minutes,
                limit_minutes: usage.daily_limit,
            });
        }

        let session = new_session_identifier();
        let metadata = json!({
            "userIdentifier": user.0,
            "sessionIdentifier": session.0,
            "agentIdentifier": AGENT_IDENTIFIER,
            "timestamp": now.timestamp_millis(),
        });
        let attributes = BTreeMap::from([
            ("room".to_string(), room_name.to_string()),
            ("participant".to_string(), participant_name.to_string()),
            ("userIdentifier".to_string(), user.0.clone()),
            ("sessionIdentifier".to_string(), session.0.clone()),
            ("agentIdentifier".to_string(), AGENT_IDENTIFIER.to_string()),
        ]);
        let minted = self
            .signer
            .mint(
                &TokenGrant {
                    room_name,
                    participant_name,
                    token_id: &session.0,
                    metadata,
                    attributes,
                },
                now,
            )
            .inspect_err(|e| warn!(user = %user, error = %e, "token signing failed"))?;

        let bookkeeping = BestEffort::from_result(
            self.ledger
                .ensure_record_at(&user, &session, room_name, now)
                .await,
            "ensure_record",
        );

        info!(
            user = %user,
            session = %session,
            room = room_name,
            remaining_minutes = usage.remaining_minutes(),
            "credential issued"
        );

        Ok(IssuedCredential {
            token: minted.token,
            session_identifier: session,
            user_identifier: user,
            agent_identifier: AGENT_IDENTIFIER,
            remaining_minutes: usage.remaining_minutes(),
            issued_at: minted.issued_at,
            expires_at: minted.expires_at,
            bookkeeping,
        })
    }
}
