// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Gate Service
//!
//! Serves the submission gate over HTTP for a public contact form.
//!
//! ## Endpoints
//!
//! - `POST /submit`: JSON submission, answered with a `SubmitResult`
//! - `GET /health`, `GET /healthz`: liveness
//! - `GET /metrics`: Prometheus metrics (unless disabled)
//!
//! ## Configuration
//!
//! An optional JSON file named by `CONTACT_GATE_CONFIG`, overridden by:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `TRUSTED_PROXIES`: Comma-separated proxy addresses whose `X-Forwarded-For`
//!   is believed (default: none)
//! - `MESSAGE_MAX_LEN`: Maximum message length (default: 1000)
//! - `MIN_FILL_MS`: Minimum plausible form fill time (default: 1500)
//! - `SINK_URL`, `SINK_API_KEY`, `SINK_TABLE`: hosted backend for persistence;
//!   without `SINK_URL` submissions are kept in memory

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_gate::{
    config::Config,
    handlers::{router, AppState},
    metrics::GateMetrics,
    pipeline::SubmissionGate,
    sink::{MemorySink, RestSink, SubmissionSink},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    info!(
        bind_addr = %config.bind_addr,
        tiers = config.rate_limit.tiers.len(),
        message_max_len = config.validation.message_len.max,
        min_fill_ms = config.bot_filter.min_fill_ms,
        remote_sink = config.sink.url.is_some(),
        "Starting contact gate"
    );

    let sink: Arc<dyn SubmissionSink> = if config.sink.url.is_some() {
        Arc::new(RestSink::new(&config.sink)?)
    } else {
        warn!("No SINK_URL configured, submissions are kept in memory only");
        Arc::new(MemorySink::new())
    };

    let metrics = if config.metrics.enabled {
        Some(GateMetrics::new()?)
    } else {
        None
    };

    let state = Arc::new(AppState {
        gate: SubmissionGate::new(&config, sink)?,
        metrics,
        config: config.clone(),
    });

    // Spawn ledger prune task
    let prune_state = state.clone();
    let prune_every = Duration::from_secs(config.rate_limit.prune_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(prune_every);
        loop {
            interval.tick().await;
            if let Err(e) = prune_state.gate.limiter().prune().await {
                warn!(error = %e, "Ledger prune failed");
            }
        }
    });

    let app = router(state).layer(CorsLayer::permissive());

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
