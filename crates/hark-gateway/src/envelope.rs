// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Uniform success/failure bodies and the error-to-status mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hark_core::HarkError;
use serde::Serialize;
use tracing::error;

/// `{success: true, data, message}`
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
    pub message: &'static str,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(data: T, message: &'static str) -> Self {
        Self {
            success: true,
            data,
            message,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `{success: false, error, code}`
#[derive(Debug, Serialize)]
pub struct ApiFailure {
    pub success: bool,
    pub error: String,
    pub code: u16,
}

/// An error on its way out of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Map a component error. Client errors keep their own message; anything
    /// else is logged and replaced by `fallback` so internals never leak.
    pub fn from_hark(err: HarkError, fallback: &str) -> Self {
        match err {
            HarkError::Validation(message) => Self::bad_request(message),
            quota @ HarkError::QuotaExceeded { .. } => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: quota.to_string(),
            },
            HarkError::UsageNotRecorded { archive_key, source } => {
                error!(key = %archive_key, error = %source, "usage update failed after transcript write");
                Self::internal("Transcription stored but usage could not be recorded")
            }
            other => {
                error!(error = %other, response = fallback, "request failed");
                Self::internal(fallback)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiFailure {
            success: false,
            error: self.message,
            code: self.status.as_u16(),
        };
        (self.status, Json(body)).into_response()
    }
}
