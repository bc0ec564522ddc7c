// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Tiered sliding-window rate limiter for contact submissions.
//!
//! Each submitter identity owns a ledger of submission timestamps. A check
//! walks the configured tiers from the shortest window to the longest and
//! denies on the first tier that is full. When every tier passes, the same
//! call appends the current timestamp, so checking and recording can never
//! be split by a concurrent submission from the same identity.
//!
//! The ledger lives behind [`RateLimitStore`] so it can be swapped for an
//! external cache without touching the limiter.

use crate::config::RateLimitConfig;
pub use crate::config::RateTier;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Outcome of a check-and-reserve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Milliseconds until the violated tier frees a slot
    pub retry_after_ms: Option<i64>,
    /// Label of the first tier found full
    pub violated_tier: Option<String>,
}

impl RateDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after_ms: None,
            violated_tier: None,
        }
    }

    pub fn denied(tier: &RateTier, retry_after_ms: i64) -> Self {
        Self {
            allowed: false,
            retry_after_ms: Some(retry_after_ms),
            violated_tier: Some(tier.label.clone()),
        }
    }
}

/// Evaluate `tiers` (in order) against an identity's timestamps.
///
/// A timestamp `t` is inside a tier's window when `now - t < window_ms`.
/// Timestamps must be non-decreasing.
pub fn evaluate_tiers(timestamps: &[i64], tiers: &[RateTier], now: i64) -> RateDecision {
    for tier in tiers {
        let mut in_window = timestamps.iter().filter(|&&t| now - t < tier.window_ms);
        let Some(&oldest) = in_window.next() else {
            continue;
        };
        let count = 1 + in_window.count();

        if count >= tier.max_count as usize {
            let retry_after_ms = oldest.saturating_add(tier.window_ms).saturating_sub(now);
            return RateDecision::denied(tier, retry_after_ms);
        }
    }
    RateDecision::allowed()
}

/// Longest window among `tiers`; older timestamps can no longer count.
pub fn horizon_ms(tiers: &[RateTier]) -> i64 {
    tiers.iter().map(|t| t.window_ms).max().unwrap_or(0)
}

/// Storage seam for the rate-limit ledger.
///
/// `append_and_check` must be atomic per identity: two concurrent calls for
/// the same identity may never both observe the pre-append count.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Snapshot of an identity's recorded timestamps (empty if unknown).
    async fn get(&self, identity: &str) -> Result<Vec<i64>>;

    /// Trim expired timestamps, evaluate `tiers`, and append `now` when allowed.
    async fn append_and_check(
        &self,
        identity: &str,
        tiers: &[RateTier],
        now: i64,
    ) -> Result<RateDecision>;

    /// Drop identities with no timestamp inside `horizon_ms` of `now`.
    /// Returns the number of identities removed.
    async fn prune(&self, now: i64, horizon_ms: i64) -> Result<usize>;
}

type Slot = Arc<Mutex<Vec<i64>>>;

/// In-process ledger with one lock per identity.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: RwLock<HashMap<String, Slot>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities currently tracked.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn slot(&self, identity: &str) -> Slot {
        {
            let entries = self.entries.read().await;
            if let Some(slot) = entries.get(identity) {
                return slot.clone();
            }
        }

        let mut entries = self.entries.write().await;
        entries.entry(identity.to_string()).or_default().clone()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryLedger {
    async fn get(&self, identity: &str) -> Result<Vec<i64>> {
        let slot = {
            let entries = self.entries.read().await;
            entries.get(identity).cloned()
        };
        match slot {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn append_and_check(
        &self,
        identity: &str,
        tiers: &[RateTier],
        now: i64,
    ) -> Result<RateDecision> {
        let slot = self.slot(identity).await;
        let mut timestamps = slot.lock().await;

        let horizon = horizon_ms(tiers);
        timestamps.retain(|&t| now - t < horizon);

        let decision = evaluate_tiers(&timestamps, tiers, now);
        if decision.allowed {
            // Keep the ledger non-decreasing if the clock stepped backwards
            let stamp = timestamps.last().map_or(now, |&last| last.max(now));
            timestamps.push(stamp);
        }
        Ok(decision)
    }

    async fn prune(&self, now: i64, horizon_ms: i64) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|_, slot| {
            // Another task holds this slot; leave it alone
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(timestamps) => timestamps.iter().any(|&t| now - t < horizon_ms),
                Err(_) => true,
            }
        });

        Ok(before - entries.len())
    }
}

/// Tiered rate limiter over an injected store and clock.
pub struct RateLimiter {
    tiers: Vec<RateTier>,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter. Tiers are ordered from the shortest window to the longest.
    pub fn new(
        config: &RateLimitConfig,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut tiers = config.tiers.clone();
        tiers.sort_by_key(|t| t.window_ms);
        Self {
            tiers,
            store,
            clock,
        }
    }

    /// In-memory ledger on the wall clock.
    pub fn in_memory(config: &RateLimitConfig) -> Self {
        Self::new(config, Arc::new(InMemoryLedger::new()), Arc::new(SystemClock))
    }

    pub fn tiers(&self) -> &[RateTier] {
        &self.tiers
    }

    /// Check every tier for `identity` and, if all pass, reserve a slot.
    pub async fn check_and_reserve(&self, identity: &str) -> Result<RateDecision> {
        let now = self.clock.now_ms();
        let decision = self
            .store
            .append_and_check(identity, &self.tiers, now)
            .await?;

        if decision.allowed {
            debug!(%identity, "Submission slot reserved");
        } else {
            debug!(
                %identity,
                tier = ?decision.violated_tier,
                retry_after_ms = ?decision.retry_after_ms,
                "Rate limit tier full"
            );
        }
        Ok(decision)
    }

    /// Recorded timestamps for `identity`.
    pub async fn history(&self, identity: &str) -> Result<Vec<i64>> {
        self.store.get(identity).await
    }

    /// Remove identities whose timestamps have all left the longest window.
    pub async fn prune(&self) -> Result<usize> {
        let removed = self
            .store
            .prune(self.clock.now_ms(), horizon_ms(&self.tiers))
            .await?;
        if removed > 0 {
            debug!(removed, "Pruned idle rate-limit ledgers");
        }
        Ok(removed)
    }
}
