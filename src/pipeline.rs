// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission pipeline.
//!
//! `Received → BotChecked → RateChecked → Validated → Sanitized → Persisted`
//!
//! Any stage can end the run in a terminal rejection. Rejections are turned
//! into a [`SubmitResult`] here and never escape as errors. Bot rejections
//! are reported to the caller exactly like a successful submission.

use crate::bot_filter::{BotFilter, BotSignal};
use crate::config::Config;
use crate::error::Result;
use crate::limiter::{Clock, InMemoryLedger, RateLimitStore, RateLimiter, SystemClock};
use crate::sanitizer::Sanitizer;
use crate::sink::SubmissionSink;
use crate::submission::{ContactRecord, NewContactRow, SubmissionRequest, SubmitterIdentity};
use crate::validator::{SubmissionValidator, Violation};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    RateLimitExceeded,
    ValidationFailed,
    DuplicateSubmission,
    ConstraintViolation,
    InvalidDataFormat,
    AuthorizationError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            Self::ConstraintViolation => "CONSTRAINT_VIOLATION",
            Self::InvalidDataFormat => "INVALID_DATA_FORMAT",
            Self::AuthorizationError => "AUTHORIZATION_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Fixed message for persistence categories. Backend text is never used.
    fn persistence_message(&self) -> &'static str {
        match self {
            Self::DuplicateSubmission => "A submission with this information already exists.",
            Self::InvalidDataFormat => "Invalid data format. Please check your inputs.",
            Self::ConstraintViolation => {
                "This submission could not be saved. Please try again with different data."
            }
            Self::AuthorizationError => "You do not have permission to submit this form.",
            _ => "Failed to submit the form. Please try again later.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline position of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Received,
    BotChecked,
    RateChecked,
    Validated,
    Sanitized,
    Persisted,
    RejectedBot,
    RejectedRateLimit,
    RejectedInvalid,
    RejectedPersistenceError,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Persisted
                | Self::RejectedBot
                | Self::RejectedRateLimit
                | Self::RejectedInvalid
                | Self::RejectedPersistenceError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::BotChecked => "bot_checked",
            Self::RateChecked => "rate_checked",
            Self::Validated => "validated",
            Self::Sanitized => "sanitized",
            Self::Persisted => "persisted",
            Self::RejectedBot => "rejected_bot",
            Self::RejectedRateLimit => "rejected_rate_limit",
            Self::RejectedInvalid => "rejected_invalid",
            Self::RejectedPersistenceError => "rejected_persistence_error",
        }
    }
}

/// Why a submission was not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("bot submission detected: {0}")]
    BotDetected(BotSignal),

    #[error("rate limit exceeded on {tier} tier, retry in {retry_after_ms}ms")]
    RateLimitExceeded { tier: String, retry_after_ms: i64 },

    #[error("validation failed on {} field(s)", .0.len())]
    ValidationFailed(Vec<Violation>),

    #[error("persistence failed: {0}")]
    PersistenceFailed(ErrorKind),
}

impl Rejection {
    pub fn state(&self) -> PipelineState {
        match self {
            Self::BotDetected(_) => PipelineState::RejectedBot,
            Self::RateLimitExceeded { .. } => PipelineState::RejectedRateLimit,
            Self::ValidationFailed(_) => PipelineState::RejectedInvalid,
            Self::PersistenceFailed(_) => PipelineState::RejectedPersistenceError,
        }
    }
}

/// Caller-facing result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl SubmitResult {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
            error_kind: None,
            retry_after_ms: None,
            violations: Vec::new(),
        }
    }

    /// Request body that could not be read as a submission.
    pub fn malformed() -> Self {
        let kind = ErrorKind::InvalidDataFormat;
        Self::failed(kind, kind.persistence_message().to_string())
    }

    fn failed(kind: ErrorKind, error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            error_kind: Some(kind),
            retry_after_ms: None,
            violations: Vec::new(),
        }
    }
}

impl From<&Rejection> for SubmitResult {
    fn from(rejection: &Rejection) -> Self {
        match rejection {
            // Indistinguishable from a stored submission
            Rejection::BotDetected(_) => SubmitResult::accepted(),
            Rejection::RateLimitExceeded { retry_after_ms, .. } => {
                let minutes = retry_after_ms.saturating_add(59_999) / 60_000;
                let wait = if minutes <= 1 {
                    "a minute".to_string()
                } else {
                    format!("{minutes} minutes")
                };
                SubmitResult {
                    retry_after_ms: Some(*retry_after_ms),
                    ..SubmitResult::failed(
                        ErrorKind::RateLimitExceeded,
                        format!("Too many submissions. Please try again in {wait}."),
                    )
                }
            }
            Rejection::ValidationFailed(violations) => SubmitResult {
                violations: violations.clone(),
                ..SubmitResult::failed(
                    ErrorKind::ValidationFailed,
                    "Please correct the highlighted fields and try again.".to_string(),
                )
            },
            Rejection::PersistenceFailed(kind) => {
                SubmitResult::failed(*kind, kind.persistence_message().to_string())
            }
        }
    }
}

/// Full outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct Processed {
    pub state: PipelineState,
    pub result: SubmitResult,
    /// Stored row, when the run reached `Persisted`
    pub record: Option<ContactRecord>,
}

/// The submission gate: bot filter, rate limiter, validator, sanitizer, sink.
pub struct SubmissionGate {
    bot_filter: BotFilter,
    limiter: RateLimiter,
    validator: SubmissionValidator,
    sanitizer: Sanitizer,
    sink: Arc<dyn SubmissionSink>,
}

impl SubmissionGate {
    /// Gate with an in-memory ledger on the wall clock.
    pub fn new(config: &Config, sink: Arc<dyn SubmissionSink>) -> Result<Self> {
        Self::with_store(
            config,
            Arc::new(InMemoryLedger::new()),
            Arc::new(SystemClock),
            sink,
        )
    }

    /// Gate over an explicit rate-limit store and clock.
    pub fn with_store(
        config: &Config,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn SubmissionSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bot_filter: BotFilter::new(config.bot_filter.clone())?,
            limiter: RateLimiter::new(&config.rate_limit, store, clock),
            validator: SubmissionValidator::new(config.validation.clone())?,
            sanitizer: Sanitizer::new(),
            sink,
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Run a submission through the gate.
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        identity: &SubmitterIdentity,
    ) -> SubmitResult {
        self.process(request, identity).await.result
    }

    /// Run a submission through the gate, reporting the terminal state.
    pub async fn process(
        &self,
        request: &SubmissionRequest,
        identity: &SubmitterIdentity,
    ) -> Processed {
        let identity = if identity.as_str().trim().is_empty() {
            SubmitterIdentity::derive(None, None, &[], &request.email)
        } else {
            identity.clone()
        };

        match self.run(request, &identity).await {
            Ok(record) => {
                info!(id = %record.id, %identity, "Contact submission persisted");
                Processed {
                    state: PipelineState::Persisted,
                    result: SubmitResult::accepted(),
                    record: Some(record),
                }
            }
            Err(rejection) => Processed {
                state: rejection.state(),
                result: SubmitResult::from(&rejection),
                record: None,
            },
        }
    }

    async fn run(
        &self,
        request: &SubmissionRequest,
        identity: &SubmitterIdentity,
    ) -> std::result::Result<ContactRecord, Rejection> {
        let mut state = PipelineState::Received;

        let verdict = self.bot_filter.classify(request);
        if let (true, Some(signal)) = (verdict.is_bot, verdict.signal) {
            warn!(%identity, %signal, "Bot submission dropped silently");
            return Err(Rejection::BotDetected(signal));
        }
        advance(&mut state, PipelineState::BotChecked);

        let decision = self
            .limiter
            .check_and_reserve(identity.as_str())
            .await
            .map_err(|e| {
                error!(%identity, error = %e, "Rate limit store unavailable");
                Rejection::PersistenceFailed(ErrorKind::UnknownError)
            })?;
        if !decision.allowed {
            let tier = decision.violated_tier.unwrap_or_default();
            let retry_after_ms = decision.retry_after_ms.unwrap_or(0);
            warn!(%identity, %tier, retry_after_ms, "Submission rate limited");
            return Err(Rejection::RateLimitExceeded {
                tier,
                retry_after_ms,
            });
        }
        advance(&mut state, PipelineState::RateChecked);

        let outcome = self.validator.validate(request);
        if !outcome.is_valid() {
            info!(%identity, violations = outcome.violations.len(), "Submission failed validation");
            return Err(Rejection::ValidationFailed(outcome.violations));
        }
        advance(&mut state, PipelineState::Validated);

        let submission = self.sanitizer.sanitize(request);

        // Markup-only input can pass on raw length and strip down to nothing
        let outcome = self.validator.validate(&SubmissionRequest::from(&submission));
        if !outcome.is_valid() {
            info!(%identity, violations = outcome.violations.len(), "Sanitized submission failed validation");
            return Err(Rejection::ValidationFailed(outcome.violations));
        }
        advance(&mut state, PipelineState::Sanitized);

        let row = NewContactRow {
            submission,
            ip_address: identity.to_string(),
        };
        self.sink.insert(row).await.map_err(|e| {
            error!(
                %identity,
                code = ?e.code,
                status = ?e.status,
                message = %e.message,
                "Persistence collaborator rejected submission"
            );
            Rejection::PersistenceFailed(e.kind())
        })
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    trace!(from = state.as_str(), to = next.as_str(), "Pipeline transition");
    *state = next;
    debug!(stage = state.as_str(), "Stage passed");
}
