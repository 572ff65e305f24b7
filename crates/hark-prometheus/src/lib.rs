// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the Hark voice session service.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via the `render()` method,
//! which is exposed through the gateway's /metrics endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use hark_core::{AdapterType, HarkError, HealthStatus, PluginAdapter};

pub use recording::{
    record_credential_issued, record_quota_rejection, record_request, record_transcript_stored,
    record_usage_minutes,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn new() -> Result<Self, HarkError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| HarkError::Internal(format!("failed to install Prometheus recorder: {e}")))?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Build an adapter around a recorder that is not installed globally.
    ///
    /// Metrics recorded through the facade do not reach it unless the caller
    /// scopes them with `metrics::with_local_recorder`.
    pub fn detached() -> (Self, metrics_exporter_prometheus::PrometheusRecorder) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (Self { handle }, recorder)
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, HarkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HarkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_metrics_render_in_text_format() {
        let (adapter, recorder) = PrometheusAdapter::detached();
        metrics::with_local_recorder(&recorder, || {
            record_credential_issued();
            record_credential_issued();
            record_usage_minutes(7);
            record_transcript_stored("2.0");
        });

        let text = adapter.render();
        assert!(text.contains("hark_credentials_issued_total 2"));
        assert!(text.contains("hark_usage_minutes_total 7"));
        assert!(text.contains("hark_transcripts_stored_total{version=\"2.0\"} 1"));
    }

    #[test]
    fn recording_without_a_recorder_is_a_no_op() {
        record_quota_rejection();
        record_request("check-usage", 200, 0.01);
    }

    #[tokio::test]
    async fn adapter_reports_healthy() {
        let (adapter, _recorder) = PrometheusAdapter::detached();
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
