// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Submission Gate
//!
//! This crate decides, for each inbound contact form submission, whether it
//! is accepted and in what form it is persisted:
//!
//! - Bot filtering (honeypot, fill time, name/email echo, spam keywords)
//! - Tiered rate limiting per submitter (3/hour, 5/day, 15/week default)
//! - Field validation with all violations reported at once
//! - Markup stripping and normalization before persistence
//! - Persistence through an injected sink with coarse error categories

pub mod bot_filter;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod pipeline;
pub mod sanitizer;
pub mod sink;
pub mod submission;
pub mod validator;

pub use config::Config;
pub use error::{GateError, Result};
pub use limiter::{RateDecision, RateLimitStore, RateLimiter};
pub use pipeline::{ErrorKind, PipelineState, SubmissionGate, SubmitResult};
pub use submission::{SanitizedSubmission, SubmissionRequest, SubmitterIdentity};
pub use validator::{SubmissionValidator, ValidationOutcome};
