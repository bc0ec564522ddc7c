// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Heuristic bot filter.
//!
//! Runs before any stateful work. Any single heuristic is enough to flag a
//! submission:
//! - Honeypot field filled in
//! - Form submitted faster than a human could fill it
//! - Name identical to email
//! - Spam keyword in the message

use crate::config::BotFilterConfig;
use crate::error::{GateError, Result};
use crate::submission::SubmissionRequest;
use aho_corasick::AhoCorasick;
use std::fmt;
use tracing::debug;

/// Heuristic that flagged a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotSignal {
    Honeypot,
    TooFast,
    NameIsEmail,
    SpamKeyword,
}

impl fmt::Display for BotSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Honeypot => write!(f, "honeypot filled"),
            Self::TooFast => write!(f, "submitted too fast"),
            Self::NameIsEmail => write!(f, "name equals email"),
            Self::SpamKeyword => write!(f, "spam keyword"),
        }
    }
}

/// Bot classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotVerdict {
    pub is_bot: bool,
    /// First heuristic that fired; for server-side logs only.
    pub signal: Option<BotSignal>,
}

impl BotVerdict {
    const HUMAN: Self = Self {
        is_bot: false,
        signal: None,
    };

    fn bot(signal: BotSignal) -> Self {
        Self {
            is_bot: true,
            signal: Some(signal),
        }
    }
}

/// Stateless bot classifier.
pub struct BotFilter {
    config: BotFilterConfig,
    keywords: Option<AhoCorasick>,
}

impl BotFilter {
    /// Build a filter, compiling the spam keyword automaton.
    pub fn new(config: BotFilterConfig) -> Result<Self> {
        let keywords: Vec<&str> = config
            .spam_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();

        let keywords = if keywords.is_empty() {
            None
        } else {
            let automaton = AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .build(&keywords)
                .map_err(|e| GateError::InvalidPattern {
                    name: "spam_keywords",
                    reason: e.to_string(),
                })?;
            Some(automaton)
        };

        Ok(Self { config, keywords })
    }

    /// Classify a submission. Pure; no side effects.
    pub fn classify(&self, request: &SubmissionRequest) -> BotVerdict {
        if self.config.check_honeypot
            && request
                .honeypot
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty())
        {
            debug!("Honeypot field filled");
            return BotVerdict::bot(BotSignal::Honeypot);
        }

        if self.config.min_fill_ms > 0 {
            if let (Some(loaded), Some(submitted)) =
                (request.form_load_timestamp, request.submission_timestamp)
            {
                let elapsed = submitted.saturating_sub(loaded);
                if elapsed < self.config.min_fill_ms {
                    debug!(elapsed_ms = elapsed, "Form filled implausibly fast");
                    return BotVerdict::bot(BotSignal::TooFast);
                }
            }
        }

        if self.config.check_name_equals_email
            && !request.name.trim().is_empty()
            && request.name == request.email
        {
            debug!("Name field identical to email field");
            return BotVerdict::bot(BotSignal::NameIsEmail);
        }

        if let Some(automaton) = &self.keywords {
            if automaton.is_match(&request.message) {
                debug!("Spam keyword in message");
                return BotVerdict::bot(BotSignal::SpamKeyword);
            }
        }

        BotVerdict::HUMAN
    }
}
