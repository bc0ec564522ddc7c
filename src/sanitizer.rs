// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Content-safety transformation applied before persistence.
//!
//! Output text never contains `<` or `>`, so no markup survives. Every step
//! maps clean input to itself, which keeps `sanitize` idempotent.

use crate::submission::{SanitizedSubmission, SubmissionRequest};
use regex::Regex;
use std::sync::LazyLock;

/// Script and style elements are dropped together with their content.
static EMBEDDED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")
        .expect("valid embedded code pattern")
});

/// Anything an HTML tokenizer would open as a tag, comment or declaration.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[/!?]?[A-Za-z!\-][^>]*>").expect("valid tag pattern"));

/// Markup-stripping sanitizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sanitizer;

impl Sanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Sanitize every field of a (validated) submission.
    pub fn sanitize(&self, request: &SubmissionRequest) -> SanitizedSubmission {
        SanitizedSubmission {
            name: self.sanitize_text(&request.name),
            email: self.sanitize_text(&request.email).to_lowercase(),
            phone: request.phone.as_deref().and_then(|p| self.normalize_phone(p)),
            subject: self.sanitize_text(&request.subject),
            message: self.sanitize_text(&request.message),
        }
    }

    /// Strip markup and control characters, then trim.
    pub fn sanitize_text(&self, input: &str) -> String {
        let without_code = EMBEDDED_CODE.replace_all(input, "");
        let without_tags = TAG.replace_all(&without_code, "");

        let cleaned: String = without_tags
            .chars()
            .filter(|c| *c != '<' && *c != '>')
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
            .collect();

        cleaned.trim().to_string()
    }

    /// Keep digits and common separators; empty results become `None`.
    pub fn normalize_phone(&self, input: &str) -> Option<String> {
        let stripped = self.sanitize_text(input);
        let kept: String = stripped
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'))
            .collect();

        let kept = kept.trim();
        if kept.chars().any(|c| c.is_ascii_digit()) {
            Some(kept.to_string())
        } else {
            None
        }
    }
}
