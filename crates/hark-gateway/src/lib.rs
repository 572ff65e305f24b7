// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API for the Hark voice session service.
//!
//! Three JSON operations share one entrypoint and are selected by the last
//! path segment: `generate-token`, `store-transcription` and `check-usage`.
//! Responses use a uniform `{success, data, message}` or
//! `{success: false, error, code}` envelope and always carry permissive CORS
//! headers.

pub mod client;
pub mod cors;
pub mod envelope;
pub mod handlers;
pub mod server;

pub use envelope::{ApiError, ApiFailure, ApiSuccess};
pub use server::{GatewayState, HealthState, ServerConfig, build_router, serve, start_server};
