// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the credential and usage API.
//!
//! The API routes on the last path segment only, so it can sit behind any
//! prefix (`/prod/api/generate-token`, `/generate-token`, ...).

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    Json,
    body::{Bytes, to_bytes},
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use hark_archive::{TranscriptPayload, TranscriptSubmission};
use hark_core::{HarkError, HealthStatus, SessionIdentifier, UserIdentifier};
use hark_credential::CredentialRequest;

use crate::client::client_address;
use crate::envelope::{ApiError, ApiSuccess};
use crate::server::GatewayState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Request body for `generate-token`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub token: String,
    pub session_identifier: String,
    /// Same value as `sessionIdentifier`, for agents using the older name.
    pub token_identifier: String,
    pub agent_identifier: &'static str,
    pub remaining_minutes: u32,
}

/// Request body for `store-transcription`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreTranscriptionRequest {
    #[serde(default)]
    pub transcription: Option<Value>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub participant_name: Option<String>,
    #[serde(default)]
    pub user_identifier: Option<String>,
    #[serde(default, alias = "tokenIdentifier")]
    pub session_identifier: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredData {
    pub transcription_key: String,
    pub stored_at: i64,
}

/// Request body for `check-usage`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUsageRequest {
    #[serde(default)]
    pub user_identifier: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageData {
    pub user_identifier: String,
    pub used_minutes: u32,
    pub remaining_minutes: u32,
    pub daily_limit: u32,
    pub allowed: bool,
    /// Epoch milliseconds of the next UTC midnight.
    pub reset_time: i64,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub storage: String,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let (status, storage) = match &state.health.storage {
        None => ("ok", "not configured".to_string()),
        Some(adapter) => match adapter.health_check().await {
            Ok(HealthStatus::Healthy) => ("ok", "healthy".to_string()),
            Ok(HealthStatus::Degraded(why)) => ("degraded", format!("degraded: {why}")),
            Ok(HealthStatus::Unhealthy(why)) => ("degraded", format!("unhealthy: {why}")),
            Err(e) => ("degraded", format!("unhealthy: {e}")),
        },
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        storage,
    })
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Fallback handler: dispatch on the trailing path segment.
pub async fn dispatch(State(state): State<GatewayState>, request: Request) -> Response {
    let started = Instant::now();
    let segment = trailing_segment(request.uri().path()).to_string();
    let address = client_address(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
    );

    let body = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "request body rejected");
            return ApiError::bad_request("Request body could not be read").into_response();
        }
    };

    let (route, response) = match segment.as_str() {
        "generate-token" => (
            "generate-token",
            generate_token(&state, &body, address).await.into_response(),
        ),
        "store-transcription" => (
            "store-transcription",
            store_transcription(&state, &body).await.into_response(),
        ),
        "check-usage" => (
            "check-usage",
            check_usage(&state, &body).await.into_response(),
        ),
        other => {
            warn!(segment = other, "unknown api path");
            (
                "unknown",
                ApiError::internal(format!("Invalid path: {other}")).into_response(),
            )
        }
    };

    hark_prometheus::record_request(
        route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn generate_token(
    state: &GatewayState,
    body: &Bytes,
    client_address: String,
) -> Result<ApiSuccess<TokenData>, ApiError> {
    let body: GenerateTokenRequest = parse_body(body)?;
    let request = CredentialRequest {
        room_name: body.room_name.unwrap_or_default(),
        participant_name: body.participant_name.unwrap_or_default(),
        client_address,
    };

    match state.issuer.issue(&request).await {
        Ok(issued) => {
            hark_prometheus::record_credential_issued();
            Ok(ApiSuccess::new(
                TokenData {
                    token: issued.token,
                    session_identifier: issued.session_identifier.0.clone(),
                    token_identifier: issued.session_identifier.0,
                    agent_identifier: issued.agent_identifier,
                    remaining_minutes: issued.remaining_minutes,
                },
                "Token generated successfully",
            ))
        }
        Err(e) => {
            if matches!(e, HarkError::QuotaExceeded { .. }) {
                hark_prometheus::record_quota_rejection();
            }
            Err(ApiError::from_hark(e, "Failed to create token"))
        }
    }
}

async fn store_transcription(
    state: &GatewayState,
    body: &Bytes,
) -> Result<ApiSuccess<StoredData>, ApiError> {
    let body: StoreTranscriptionRequest = parse_body(body)?;
    let payload = TranscriptPayload::from_value(body.transcription)
        .map_err(|e| ApiError::from_hark(e, "Failed to store transcription"))?;

    let submission = TranscriptSubmission {
        payload,
        room_name: body.room_name.unwrap_or_default(),
        participant_name: body.participant_name,
        user_identifier: UserIdentifier(body.user_identifier.unwrap_or_default()),
        session_identifier: SessionIdentifier(body.session_identifier.unwrap_or_default()),
        duration_seconds: body.duration.unwrap_or(0.0),
        timestamp: body.timestamp,
    };

    let stored = state
        .archive
        .store(submission)
        .await
        .map_err(|e| ApiError::from_hark(e, "Failed to store transcription"))?;

    hark_prometheus::record_transcript_stored(stored.format_version);
    if stored.minutes_recorded > 0 {
        hark_prometheus::record_usage_minutes(stored.minutes_recorded);
    }

    Ok(ApiSuccess::new(
        StoredData {
            transcription_key: stored.archive_key,
            stored_at: stored.stored_at.timestamp_millis(),
        },
        "Transcription stored successfully",
    ))
}

async fn check_usage(
    state: &GatewayState,
    body: &Bytes,
) -> Result<ApiSuccess<UsageData>, ApiError> {
    let body: CheckUsageRequest = parse_body(body)?;
    let user = match body.user_identifier {
        Some(user) if !user.trim().is_empty() => UserIdentifier(user),
        _ => return Err(ApiError::bad_request("userIdentifier is required")),
    };

    let report = state.ledger.get_usage(&user).await;
    Ok(ApiSuccess::new(
        UsageData {
            user_identifier: user.0,
            used_minutes: report.used_minutes,
            remaining_minutes: report.remaining_minutes(),
            daily_limit: report.daily_limit,
            allowed: report.allowed,
            reset_time: report.reset_time.timestamp_millis(),
        },
        "Usage data retrieved successfully",
    ))
}

/// An empty body reads as `{}`.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "malformed request body");
        ApiError::bad_request("Invalid JSON body")
    })
}

fn trailing_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}
