// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hark serve` command implementation.
//!
//! Wires storage, the usage ledger, the credential issuer, the transcript
//! archive and the optional Prometheus exporter into the gateway, then
//! serves until SIGINT/SIGTERM. Expired usage rows are purged in the
//! background while the server runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use hark_archive::TranscriptArchive;
use hark_config::HarkConfig;
use hark_core::{HarkError, PluginAdapter, StorageAdapter};
use hark_credential::{CredentialIssuer, Fingerprinter, TokenSigner};
use hark_gateway::{GatewayState, HealthState, ServerConfig, start_server};
use hark_prometheus::PrometheusAdapter;
use hark_storage::SqliteStorage;
use hark_usage::UsageLedger;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Runs the `hark serve` command.
pub async fn run_serve(config: HarkConfig) -> Result<(), HarkError> {
    info!(service = %config.service.name, "starting hark serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let ledger = UsageLedger::new(storage.clone());
    let signer = TokenSigner::from_config(&config.media)?;
    let fingerprinter = match &config.identity.fingerprint_key {
        Some(key) => Fingerprinter::keyed(key.as_bytes()),
        None => {
            warn!("identity.fingerprint_key not set; user identifiers are plain address hashes");
            Fingerprinter::unkeyed()
        }
    };
    let issuer = CredentialIssuer::new(ledger.clone(), signer, fingerprinter);
    let archive = TranscriptArchive::new(storage.clone(), ledger.clone());

    let prometheus_render = if config.prometheus.enabled {
        match PrometheusAdapter::new() {
            Ok(adapter) => {
                let adapter = Arc::new(adapter);
                let render: Arc<dyn Fn() -> String + Send + Sync> =
                    Arc::new(move || adapter.render());
                Some(render)
            }
            Err(e) => {
                warn!(error = %e, "prometheus exporter unavailable; /metrics disabled");
                None
            }
        }
    } else {
        debug!("prometheus exporter disabled");
        None
    };

    let state = GatewayState {
        issuer,
        archive,
        ledger,
        health: HealthState {
            start_time: Instant::now(),
            prometheus_render,
            storage: Some(storage.clone() as Arc<dyn PluginAdapter>),
        },
    };

    let cancel = install_signal_handler();

    {
        let storage = storage.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            purge_loop(storage, PURGE_INTERVAL, cancel).await;
        });
    }

    let shutdown = {
        let cancel = cancel.clone();
        async move { cancel.cancelled().await }
    };
    let served = start_server(&ServerConfig::from(&config.gateway), state, shutdown).await;

    // Stop background tasks even when the server exited on its own.
    cancel.cancel();
    log_heap("shutdown");
    storage.close().await?;
    served?;

    info!("hark serve shutdown complete");
    Ok(())
}

/// Cancelled on SIGINT or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable; only Ctrl+C stops the server");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

/// Delete expired usage records every `every` until cancelled.
async fn purge_loop(storage: Arc<SqliteStorage>, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match storage.purge_expired(Utc::now()).await {
                    Ok(0) => debug!("no expired usage records"),
                    Ok(purged) => info!(purged, "expired usage records purged"),
                    Err(e) => warn!(error = %e, "usage purge failed (non-fatal)"),
                }
                log_heap("purge");
            }
            _ = cancel.cancelled() => {
                debug!("purge task shutting down");
                break;
            }
        }
    }
}

#[cfg(not(target_env = "msvc"))]
fn log_heap(at: &'static str) {
    let _ = tikv_jemalloc_ctl::epoch::advance();
    let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
    let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
    debug!(
        at,
        allocated_mb = allocated / (1024 * 1024),
        resident_mb = resident / (1024 * 1024),
        "heap"
    );
}

#[cfg(target_env = "msvc")]
fn log_heap(_at: &'static str) {}
