// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact gate service.
//!
//! The form posts JSON to `/submit` and gets a [`SubmitResult`] back, also
//! when the body is not a readable submission. Bot submissions get the same
//! 200 response as stored ones.
//!
//! Submitters are keyed by peer address. `X-Forwarded-For` only counts when
//! the peer is a configured trusted proxy.

use crate::config::Config;
use crate::metrics::GateMetrics;
use crate::pipeline::{ErrorKind, PipelineState, SubmissionGate, SubmitResult};
use crate::submission::{SubmissionRequest, SubmitterIdentity};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub gate: SubmissionGate,
    pub metrics: Option<GateMetrics>,
    pub config: Config,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/submit", post(submit));

    if state.metrics.is_some() {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-gate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run a contact form submission through the gate.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<SubmissionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            info!(error = %rejection, "Unreadable submission body");
            return (StatusCode::BAD_REQUEST, Json(SubmitResult::malformed())).into_response();
        }
    };

    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let identity = SubmitterIdentity::derive(
        forwarded_for,
        peer,
        &state.config.trusted_proxies,
        &req.email,
    );

    debug!(%identity, "Processing contact submission");

    let started = Instant::now();
    let processed = state.gate.process(&req, &identity).await;
    if let Some(metrics) = &state.metrics {
        metrics.observe(processed.state, started.elapsed());
    }

    let status = status_for(processed.state, &processed.result);
    let mut response = (status, Json(&processed.result)).into_response();

    if let Some(retry_ms) = processed.result.retry_after_ms {
        let secs = (retry_ms.max(0) as u64).div_ceil(1000);
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }

    response
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(metrics) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn status_for(state: PipelineState, result: &SubmitResult) -> StatusCode {
    match state {
        PipelineState::RejectedRateLimit => StatusCode::TOO_MANY_REQUESTS,
        PipelineState::RejectedInvalid => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineState::RejectedPersistenceError => match result.error_kind {
            Some(ErrorKind::DuplicateSubmission) => StatusCode::CONFLICT,
            Some(ErrorKind::AuthorizationError) => StatusCode::FORBIDDEN,
            Some(ErrorKind::InvalidDataFormat) | Some(ErrorKind::ConstraintViolation) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::BAD_GATEWAY,
        },
        _ => StatusCode::OK,
    }
}
