// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for gate outcomes.

use crate::pipeline::PipelineState;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Gate counters and latency histogram on a private registry.
pub struct GateMetrics {
    registry: Registry,
    submissions: IntCounterVec,
    latency: HistogramVec,
}

impl GateMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new(
                "contact_gate_submissions_total",
                "Contact submissions by terminal pipeline state",
            ),
            &["state"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                "contact_gate_latency_seconds",
                "Time spent in the submission pipeline",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["state"],
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            submissions,
            latency,
        })
    }

    /// Record one pipeline run.
    pub fn observe(&self, state: PipelineState, elapsed: Duration) {
        let label = state.as_str();
        self.submissions.with_label_values(&[label]).inc();
        self.latency
            .with_label_values(&[label])
            .observe(elapsed.as_secs_f64());
    }

    /// Count recorded for `state`.
    pub fn count(&self, state: PipelineState) -> u64 {
        self.submissions.with_label_values(&[state.as_str()]).get()
    }

    /// Render in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
