// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for abuse simulation results.

use contact_gate::PipelineState;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Collects metrics during an abuse simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    /// Count of submissions by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of submissions by identity
    per_identity: HashMap<String, usize>,
    /// Every response read as success
    all_successful: bool,
    /// Latency samples (microseconds)
    latencies: Vec<u64>,
}

/// Terminal outcome of one simulated submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Accepted,
    SilentlyDropped,
    RateLimited,
    Invalid,
    PersistenceFailed,
}

impl From<PipelineState> for Outcome {
    fn from(state: PipelineState) -> Self {
        match state {
            PipelineState::Persisted => Self::Accepted,
            PipelineState::RejectedBot => Self::SilentlyDropped,
            PipelineState::RejectedRateLimit => Self::RateLimited,
            PipelineState::RejectedInvalid => Self::Invalid,
            _ => Self::PersistenceFailed,
        }
    }
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self {
            all_successful: true,
            ..Default::default()
        }
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record a submission outcome.
    pub fn record(&mut self, outcome: Outcome, identity: &str, success: bool, latency: Duration) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.per_identity.entry(identity.to_string()).or_insert(0) += 1;
        self.all_successful &= success;
        self.latencies.push(latency.as_micros() as u64);
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// True when every recorded response reported `success: true`.
    pub fn all_successful(&self) -> bool {
        self.all_successful
    }

    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Ratio of submissions that were not stored.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        (total - self.count(Outcome::Accepted)) as f64 / total as f64
    }

    pub fn p99_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let idx = (sorted.len() as f64 * 0.99) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn unique_identities(&self) -> usize {
        self.per_identity.len()
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            accepted: self.count(Outcome::Accepted),
            silently_dropped: self.count(Outcome::SilentlyDropped),
            rate_limited: self.count(Outcome::RateLimited),
            invalid: self.count(Outcome::Invalid),
            persistence_failed: self.count(Outcome::PersistenceFailed),
            duration_ms: self.duration().as_millis() as u64,
            block_rate: self.block_rate(),
            p99_latency_us: self.p99_latency_us(),
            unique_identities: self.unique_identities(),
        }
    }
}

/// Summary report of a simulation.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub accepted: usize,
    pub silently_dropped: usize,
    pub rate_limited: usize,
    pub invalid: usize,
    pub persistence_failed: usize,
    pub duration_ms: u64,
    pub block_rate: f64,
    pub p99_latency_us: u64,
    pub unique_identities: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Abuse Simulation Report ===")?;
        writeln!(f, "Duration:           {} ms", self.duration_ms)?;
        writeln!(f, "Total Submissions:  {}", self.total_requests)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(f, "Accepted:           {}", self.accepted)?;
        writeln!(f, "Silently Dropped:   {}", self.silently_dropped)?;
        writeln!(f, "Rate Limited:       {}", self.rate_limited)?;
        writeln!(f, "Invalid:            {}", self.invalid)?;
        writeln!(f, "Persistence Failed: {}", self.persistence_failed)?;
        writeln!(f, "Block Rate:         {:.1}%", self.block_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "P99 Latency:        {} us", self.p99_latency_us)?;
        writeln!(f, "Unique Identities:  {}", self.unique_identities)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_state() {
        assert_eq!(Outcome::from(PipelineState::Persisted), Outcome::Accepted);
        assert_eq!(Outcome::from(PipelineState::RejectedBot), Outcome::SilentlyDropped);
        assert_eq!(
            Outcome::from(PipelineState::RejectedPersistenceError),
            Outcome::PersistenceFailed
        );
    }

    #[test]
    fn test_block_rate_and_success_tracking() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Accepted, "10.0.0.1", true, Duration::ZERO);
        }
        assert!(metrics.all_successful());
        for _ in 0..7 {
            metrics.record(Outcome::RateLimited, "10.0.0.1", false, Duration::ZERO);
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
        assert!(!metrics.all_successful());
        assert_eq!(metrics.unique_identities(), 1);
    }
}
