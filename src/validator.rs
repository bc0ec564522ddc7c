// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact submission validator.
//!
//! Checks every field and collects all violations instead of stopping at the
//! first one, so the submitter can fix everything in one pass.

use crate::config::{LengthBounds, ValidationConfig};
use crate::error::{GateError, Result};
use crate::submission::SubmissionRequest;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Submission field, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Phone,
    Subject,
    Message,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Subject => "subject",
            Self::Message => "message",
        };
        f.write_str(name)
    }
}

/// A single failed field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: Field,
    pub reason: String,
}

/// Result of validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Violation for `field`, if any.
    pub fn violation(&self, field: Field) -> Option<&Violation> {
        self.violations.iter().find(|v| v.field == field)
    }
}

/// Field-level submission validator.
pub struct SubmissionValidator {
    config: ValidationConfig,
    email: Regex,
    phone: Regex,
}

impl SubmissionValidator {
    /// Create a validator, compiling the configured patterns.
    pub fn new(config: ValidationConfig) -> Result<Self> {
        let email = Regex::new(&config.email_pattern).map_err(|e| GateError::InvalidPattern {
            name: "email_pattern",
            reason: e.to_string(),
        })?;
        let phone = Regex::new(&config.phone_pattern).map_err(|e| GateError::InvalidPattern {
            name: "phone_pattern",
            reason: e.to_string(),
        })?;
        Ok(Self {
            config,
            email,
            phone,
        })
    }

    /// Validate a submission. Pure; violations follow field order.
    pub fn validate(&self, request: &SubmissionRequest) -> ValidationOutcome {
        let mut violations = Vec::new();

        if let Some(reason) = check_length("Name", &request.name, self.config.name_len) {
            violations.push(Violation {
                field: Field::Name,
                reason,
            });
        }

        if let Some(reason) = self.check_email(&request.email) {
            violations.push(Violation {
                field: Field::Email,
                reason,
            });
        }

        if let Some(phone) = request.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            if !self.phone.is_match(phone.trim()) {
                violations.push(Violation {
                    field: Field::Phone,
                    reason: "Please enter a valid phone number or leave it empty.".to_string(),
                });
            }
        }

        if let Some(reason) = check_length("Subject", &request.subject, self.config.subject_len) {
            violations.push(Violation {
                field: Field::Subject,
                reason,
            });
        }

        if let Some(reason) = check_length("Message", &request.message, self.config.message_len) {
            violations.push(Violation {
                field: Field::Message,
                reason,
            });
        }

        if !violations.is_empty() {
            debug!(
                fields = ?violations.iter().map(|v| v.field).collect::<Vec<_>>(),
                "Submission failed validation"
            );
        }

        ValidationOutcome {
            valid: violations.is_empty(),
            violations,
        }
    }

    fn check_email(&self, email: &str) -> Option<String> {
        let email = email.trim();
        if email.is_empty() {
            return Some("Email is required.".to_string());
        }
        if email.len() > self.config.email_max_len {
            return Some(format!(
                "Email must be at most {} characters.",
                self.config.email_max_len
            ));
        }
        if !self.email.is_match(email) {
            return Some("Please enter a valid email address.".to_string());
        }
        None
    }
}

fn check_length(label: &str, value: &str, bounds: LengthBounds) -> Option<String> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Some(format!("{label} is required."));
    }
    if !bounds.contains(len) {
        return Some(format!(
            "{label} must be between {} and {} characters.",
            bounds.min, bounds.max
        ));
    }
    None
}
