// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact submission gate.
//!
//! Every threshold the gate applies (tier limits, length bounds, patterns,
//! bot heuristics) lives here as data rather than in the stage code.

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Longest accepted tier window.
pub const MAX_WINDOW_MS: i64 = 365 * DAY_MS;

/// Configuration for the contact gate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Reverse proxies whose `X-Forwarded-For` header is believed (default: none)
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Bot heuristics configuration
    #[serde(default)]
    pub bot_filter: BotFilterConfig,

    /// Field validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Persistence collaborator configuration
    #[serde(default)]
    pub sink: SinkConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// A single rate-limit tier: at most `max_count` submissions per `window_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTier {
    pub label: String,
    pub max_count: u32,
    pub window_ms: i64,
}

impl RateTier {
    pub fn new(label: impl Into<String>, max_count: u32, window_ms: i64) -> Self {
        Self {
            label: label.into(),
            max_count,
            window_ms,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tiers, evaluated from the shortest window to the longest
    #[serde(default = "default_tiers")]
    pub tiers: Vec<RateTier>,

    /// Interval between ledger prune passes in seconds (default: 300)
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

/// Bot filter configuration. Each heuristic can be switched off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotFilterConfig {
    /// Flag submissions whose honeypot field is filled in (default: true)
    #[serde(default = "default_true")]
    pub check_honeypot: bool,

    /// Minimum plausible form fill time in milliseconds; 0 disables (default: 1500)
    #[serde(default = "default_min_fill_ms")]
    pub min_fill_ms: i64,

    /// Flag submissions whose name equals their email (default: true)
    #[serde(default = "default_true")]
    pub check_name_equals_email: bool,

    /// Case-insensitive spam keywords searched for in the message
    #[serde(default = "default_spam_keywords")]
    pub spam_keywords: Vec<String>,
}

/// Field validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_name_len")]
    pub name_len: LengthBounds,

    #[serde(default = "default_subject_len")]
    pub subject_len: LengthBounds,

    /// Message bounds; deployments commonly raise the max to 5000
    #[serde(default = "default_message_len")]
    pub message_len: LengthBounds,

    /// Maximum email length (default: 255)
    #[serde(default = "default_email_max_len")]
    pub email_max_len: usize,

    #[serde(default = "default_email_pattern")]
    pub email_pattern: String,

    #[serde(default = "default_phone_pattern")]
    pub phone_pattern: String,
}

/// Inclusive character-count bounds applied to a trimmed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, len: usize) -> bool {
        len >= self.min && len <= self.max
    }
}

/// Persistence collaborator configuration.
///
/// Without a `url` the gate persists into an in-process table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Base URL of the hosted backend (e.g. https://project.example.co)
    #[serde(default)]
    pub url: Option<String>,

    /// API key sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Target table (default: contact_submissions)
    #[serde(default = "default_table")]
    pub table: String,

    /// Request timeout in milliseconds (default: 10000)
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tiers() -> Vec<RateTier> {
    vec![
        RateTier::new("hourly", 3, HOUR_MS),
        RateTier::new("daily", 5, DAY_MS),
        RateTier::new("weekly", 15, WEEK_MS),
    ]
}

fn default_prune_interval_secs() -> u64 {
    300
}

fn default_min_fill_ms() -> i64 {
    1500
}

fn default_spam_keywords() -> Vec<String> {
    ["viagra", "casino", "lottery", "prize", "winner"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_name_len() -> LengthBounds {
    LengthBounds::new(2, 100)
}

fn default_subject_len() -> LengthBounds {
    LengthBounds::new(2, 200)
}

fn default_message_len() -> LengthBounds {
    LengthBounds::new(10, 1000)
}

fn default_email_max_len() -> usize {
    255
}

fn default_email_pattern() -> String {
    r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$".to_string()
}

fn default_phone_pattern() -> String {
    r"^\+?[0-9\s\-()]{7,20}$".to_string()
}

fn default_table() -> String {
    "contact_submissions".to_string()
}

fn default_sink_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            trusted_proxies: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            bot_filter: BotFilterConfig::default(),
            validation: ValidationConfig::default(),
            sink: SinkConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

impl Default for BotFilterConfig {
    fn default() -> Self {
        Self {
            check_honeypot: default_true(),
            min_fill_ms: default_min_fill_ms(),
            check_name_equals_email: default_true(),
            spam_keywords: default_spam_keywords(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            name_len: default_name_len(),
            subject_len: default_subject_len(),
            message_len: default_message_len(),
            email_max_len: default_email_max_len(),
            email_pattern: default_email_pattern(),
            phone_pattern: default_phone_pattern(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_table(),
            timeout_ms: default_sink_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Load configuration: optional JSON file from `CONTACT_GATE_CONFIG`,
    /// then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("CONTACT_GATE_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing sections fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(proxies) = lookup("TRUSTED_PROXIES") {
            self.trusted_proxies = proxies
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect();
        }
        if let Some(max) = lookup("MESSAGE_MAX_LEN").and_then(|v| v.parse().ok()) {
            self.validation.message_len.max = max;
        }
        if let Some(ms) = lookup("MIN_FILL_MS").and_then(|v| v.parse().ok()) {
            self.bot_filter.min_fill_ms = ms;
        }
        if let Some(url) = lookup("SINK_URL") {
            self.sink.url = Some(url);
        }
        if let Some(key) = lookup("SINK_API_KEY") {
            self.sink.api_key = Some(key);
        }
        if let Some(table) = lookup("SINK_TABLE") {
            self.sink.table = table;
        }
    }

    /// Reject configurations the stages cannot honour.
    pub fn validate(&self) -> Result<()> {
        for tier in &self.rate_limit.tiers {
            if tier.label.trim().is_empty() {
                return Err(GateError::InvalidConfig("rate tier label is empty".into()));
            }
            if tier.max_count == 0 {
                return Err(GateError::InvalidConfig(format!(
                    "rate tier {} allows zero submissions",
                    tier.label
                )));
            }
            if tier.window_ms <= 0 {
                return Err(GateError::InvalidConfig(format!(
                    "rate tier {} has a non-positive window",
                    tier.label
                )));
            }
            if tier.window_ms > MAX_WINDOW_MS {
                return Err(GateError::InvalidConfig(format!(
                    "rate tier {} window exceeds one year",
                    tier.label
                )));
            }
        }

        let v = &self.validation;
        for (field, bounds) in [
            ("name", v.name_len),
            ("subject", v.subject_len),
            ("message", v.message_len),
        ] {
            if bounds.min > bounds.max {
                return Err(GateError::InvalidConfig(format!(
                    "{field} length bounds are inverted ({} > {})",
                    bounds.min, bounds.max
                )));
            }
        }

        if self.bot_filter.min_fill_ms < 0 {
            return Err(GateError::InvalidConfig("min_fill_ms is negative".into()));
        }

        Ok(())
    }
}
