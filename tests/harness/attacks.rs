// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse traffic patterns for security testing.

use super::generators;
use contact_gate::SubmissionRequest;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

/// Kind of submission an attacker sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficKind {
    Genuine,
    Honeypot,
    FastFill,
    NameEcho,
    SpamKeyword,
    Invalid,
}

impl TrafficKind {
    /// Build the `seq`-th request of this kind.
    pub fn request(&self, seq: usize) -> SubmissionRequest {
        match self {
            Self::Genuine => generators::genuine_request(seq),
            Self::Honeypot => generators::honeypot_bot(seq),
            Self::FastFill => generators::fast_fill_bot(seq),
            Self::NameEcho => generators::echo_bot(seq),
            Self::SpamKeyword => generators::spam_bot(seq),
            Self::Invalid => generators::invalid_request(seq),
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(
            self,
            Self::Honeypot | Self::FastFill | Self::NameEcho | Self::SpamKeyword
        )
    }
}

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of submissions to send
    pub total_requests: usize,
    /// Simulated time between submissions
    pub interval_ms: i64,
    /// Number of distinct submitter identities, used round-robin
    pub unique_identities: usize,
    /// What each submission looks like
    pub kind: TrafficKind,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval_ms: 1_000,
            unique_identities: 1,
            kind: TrafficKind::Genuine,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// One identity hammering the form.
    pub fn single_identity_flood() -> Self {
        Self {
            total_requests: 200,
            interval_ms: 100,
            ..Default::default()
        }
    }

    /// Many identities, a few submissions each.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            interval_ms: 50,
            unique_identities: 100,
            ..Default::default()
        }
    }

    /// Bots that fill every field, including the hidden one.
    pub fn honeypot_swarm() -> Self {
        Self {
            total_requests: 60,
            unique_identities: 3,
            kind: TrafficKind::Honeypot,
            ..Default::default()
        }
    }

    /// Bots that submit the instant the form renders.
    pub fn fast_fill_swarm() -> Self {
        Self {
            total_requests: 60,
            unique_identities: 3,
            kind: TrafficKind::FastFill,
            ..Default::default()
        }
    }

    /// Autofill bots echoing the email into the name field.
    pub fn name_echo_swarm() -> Self {
        Self {
            total_requests: 30,
            unique_identities: 30,
            kind: TrafficKind::NameEcho,
            ..Default::default()
        }
    }

    /// Spam campaign with keyword-laden messages.
    pub fn spam_campaign() -> Self {
        Self {
            total_requests: 60,
            unique_identities: 20,
            kind: TrafficKind::SpamKeyword,
            ..Default::default()
        }
    }

    /// Malformed submissions from one identity probing the validator.
    pub fn invalid_payload_barrage() -> Self {
        Self {
            total_requests: 20,
            interval_ms: 5 * MINUTE_MS,
            kind: TrafficKind::Invalid,
            ..Default::default()
        }
    }

    /// One identity staying under every tier: one submission per 12 hours.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 10,
            interval_ms: 12 * HOUR_MS,
            ..Default::default()
        }
    }

    /// Simulated duration of the attack.
    pub fn simulated_duration_ms(&self) -> i64 {
        self.interval_ms * self.total_requests as i64
    }
}

/// Expected outcomes for different attack types.
pub struct AttackExpectations {
    /// Maximum number of rows that may be persisted
    pub max_persisted: usize,
    /// Every caller-visible result must read as success
    pub all_appear_successful: bool,
    /// Description of expected behavior
    pub description: &'static str,
}

impl AttackConfig {
    /// Get expected outcomes for this attack pattern, assuming default tiers
    /// (3/hour, 5/day, 15/week) and an attack shorter than an hour unless
    /// it is the slow drip.
    pub fn expectations(&self) -> AttackExpectations {
        if self.kind.is_bot() {
            AttackExpectations {
                max_persisted: 0,
                all_appear_successful: true,
                description: "Bots are dropped silently",
            }
        } else if self.kind == TrafficKind::Invalid {
            AttackExpectations {
                max_persisted: 0,
                all_appear_successful: false,
                description: "Invalid submissions are never stored",
            }
        } else if self.simulated_duration_ms() < HOUR_MS {
            AttackExpectations {
                max_persisted: 3 * self.unique_identities,
                all_appear_successful: false,
                description: "Each identity capped by the hourly tier",
            }
        } else {
            AttackExpectations {
                max_persisted: self.total_requests,
                all_appear_successful: false,
                description: "Traffic below every tier passes",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_kinds() {
        assert!(TrafficKind::Honeypot.is_bot());
        assert!(!TrafficKind::Genuine.is_bot());
        assert!(!TrafficKind::Invalid.is_bot());
    }

    #[test]
    fn test_flood_expectations() {
        let config = AttackConfig::single_identity_flood();
        assert!(config.simulated_duration_ms() < HOUR_MS);
        assert_eq!(config.expectations().max_persisted, 3);
    }
}
